//! # Static Server
//!
//! Servidor HTTP/1.1 concurrente de archivos estáticos implementado desde
//! cero para demostrar conceptos de sistemas operativos: productor-
//! consumidor con backpressure, pools de threads, caching LRU con pinning
//! y sincronización de un log compartido.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests y construcción de responses HTTP/1.1
//! - `config`: Configuración por archivo `KEY=VALUE`
//! - `server`: Master (acceptor), cola de admisión, workers y pools
//! - `cache`: Cache LRU de archivos por worker, con pin counts
//! - `logger`: Log de accesos compartido con rotación por tamaño
//! - `stats`: Contadores globales y payload de `/api/stats`
//! - `mime`: Tabla de Content-Types por extensión
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use static_server::config::Config;
//! use static_server::server::Server;
//!
//! let config = Config::default();
//! let mut server = Server::new(config);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod cache;
pub mod config;
pub mod http;
pub mod logger;
pub mod mime;
pub mod server;
pub mod stats;
