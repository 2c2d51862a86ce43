//! # Módulo Server
//!
//! Arquitectura productor-consumidor en dos niveles:
//!
//! - El **master** ([`master::Server`]) acepta conexiones TCP, las admite
//!   contra la cola acotada ([`queue::AdmissionQueue`]) y las reparte
//!   round-robin entre los workers por canales dedicados.
//! - Cada **worker** ([`worker`]) recibe sus conexiones, consume el token
//!   de admisión correspondiente y las despacha a su pool local de
//!   threads ([`pool::ThreadPool`]), donde el handler ([`handler`])
//!   resuelve el request contra el cache del worker.
//!
//! La saturación de la cola de admisión (o del pool) se responde con 503:
//! la cola acotada delante del despacho es lo que le da backpressure al
//! servidor.

pub mod handler;
pub mod master;
pub mod pool;
pub mod queue;
pub mod signal;
pub mod worker;

// Re-exportamos los tipos principales
pub use master::{Server, ShutdownHandle};
