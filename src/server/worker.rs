//! # Worker
//!
//! Cada worker posee su propio cache LRU, su pool de threads y un canal por
//! el que el master le entrega las conexiones aceptadas. El estado que en
//! el modelo multi-proceso vivía en globales del proceso worker (cache,
//! document root, handle del log) acá es un [`WorkerContext`] explícito que
//! se construye al arrancar el worker y viaja por referencia hasta el
//! handler.
//!
//! ## Protocolo del loop receptor
//!
//! 1. Bloquearse en el canal de conexiones propio.
//! 2. Al recibir una conexión, consumir un token de la cola de admisión
//!    (el master publica `filled_slots` **antes** de enviar la conexión,
//!    así que siempre hay un token disponible) y liberar el slot.
//! 3. Entregar la conexión al pool local; si el pool está saturado,
//!    responder 503 best-effort y cerrarla.
//!
//! El cierre del canal (el master descarta los senders) es la señal de
//! shutdown: el loop termina, se apaga el pool (join incluido) y los
//! recursos del worker se liberan con el drop del contexto.

use crate::cache::FileCache;
use crate::http::{Response, StatusCode};
use crate::logger::AccessLog;
use crate::server::pool::ThreadPool;
use crate::server::queue::AdmissionQueue;
use crate::stats::SharedStats;
use std::net::TcpStream;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Contexto por worker: reemplaza a los globales del modelo original
pub struct WorkerContext {
    /// ID lógico del worker (0..N)
    pub worker_id: usize,

    /// Raíz de archivos servidos
    pub document_root: String,

    /// Cache LRU privado de este worker
    pub cache: Arc<FileCache>,

    /// Log de accesos compartido por todos los workers
    pub log: Arc<AccessLog>,

    /// Estadísticas compartidas por todos los workers
    pub stats: Arc<SharedStats>,
}

/// Loop principal de un worker
///
/// Corre hasta que el master cierra el canal; al salir apaga el pool
/// (esperando a los threads) y deja que el drop libere cache y handles.
pub fn worker_main(
    rx: Receiver<TcpStream>,
    queue: Arc<AdmissionQueue>,
    ctx: Arc<WorkerContext>,
    threads: usize,
    max_jobs: usize,
) {
    let pool = ThreadPool::new(threads, max_jobs, Arc::clone(&ctx));

    loop {
        // El canal cerrado es la señal de shutdown
        let stream = match rx.recv() {
            Ok(stream) => stream,
            Err(_) => break,
        };

        // Consumir el token emparejado con esta conexión y liberar el
        // slot de la cola de admisión
        let _token = queue.take();

        if let Err(stream) = pool.submit(stream) {
            // Pool saturado: rechazo con 503 best-effort
            reject_with_503(stream);
        }
    }

    pool.shutdown();
}

/// Responde 503 y cierra la conexión (best-effort: los errores de
/// escritura se ignoran, el peer pudo haberse ido)
pub fn reject_with_503(mut stream: TcpStream) {
    let response = Response::error_page(StatusCode::ServiceUnavailable);
    let _ = response.write_to(&mut stream, None, false);
}
