//! # Thread Pool del Worker
//!
//! Pool fijo de threads que atiende las conexiones entregadas al worker.
//! Los jobs (conexiones aceptadas) esperan en una cola FIFO acotada
//! protegida por un mutex con condition variable.
//!
//! El productor es el loop receptor del worker; si la cola alcanza
//! `max_jobs` el submit se rechaza y la conexión se devuelve al caller
//! (que responde 503 best-effort). En el shutdown se marca el flag bajo el
//! lock, se hace broadcast de la condvar, se espera el join de todos los
//! threads y recién entonces se cierran los jobs que quedaron encolados.

use crate::server::handler;
use crate::server::worker::WorkerContext;
use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Estado de la cola de jobs, protegido por el mutex del pool
struct PoolState {
    jobs: VecDeque<TcpStream>,
    shutdown: bool,
}

/// Parte compartida entre el pool y sus threads
struct PoolShared {
    state: Mutex<PoolState>,
    cond: Condvar,
    max_jobs: usize,
}

/// Pool de threads con cola FIFO acotada de conexiones
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    threads: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Crea el pool y arranca sus `num_threads` threads
    ///
    /// Cada thread atiende una conexión a la vez con
    /// [`handler::handle_connection`] y el contexto del worker.
    pub fn new(num_threads: usize, max_jobs: usize, ctx: Arc<WorkerContext>) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
            max_jobs: max_jobs.max(1),
        });

        let mut threads = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let shared = Arc::clone(&shared);
            let ctx = Arc::clone(&ctx);

            let handle = thread::Builder::new()
                .name(format!("pool-{}-{}", ctx.worker_id, i))
                .spawn(move || Self::thread_loop(shared, ctx))
                .expect("no se pudo crear el thread del pool");

            threads.push(handle);
        }

        Self { shared, threads }
    }

    /// Loop de cada thread: esperar job, atenderlo, repetir
    fn thread_loop(shared: Arc<PoolShared>, ctx: Arc<WorkerContext>) {
        loop {
            let job = {
                let mut state = shared.state.lock().unwrap();

                // Esperar a que haya trabajo o llegue el shutdown
                while state.jobs.is_empty() && !state.shutdown {
                    state = shared.cond.wait(state).unwrap();
                }

                // Con shutdown activo se drena lo pendiente antes de salir
                if state.shutdown && state.jobs.is_empty() {
                    return;
                }

                state.jobs.pop_front()
            };

            if let Some(stream) = job {
                handler::handle_connection(stream, &ctx);
            }
        }
    }

    /// Encola una conexión para ser atendida
    ///
    /// Retorna `Err(stream)` (devolviendo la conexión) si la cola está en
    /// `max_jobs` o el pool ya está en shutdown; el caller decide cómo
    /// rechazarla.
    pub fn submit(&self, stream: TcpStream) -> Result<(), TcpStream> {
        let mut state = self.shared.state.lock().unwrap();

        if state.shutdown || state.jobs.len() >= self.shared.max_jobs {
            return Err(stream);
        }

        state.jobs.push_back(stream);
        self.shared.cond.notify_one();
        Ok(())
    }

    /// Cantidad de jobs esperando en la cola
    pub fn job_count(&self) -> usize {
        self.shared.state.lock().unwrap().jobs.len()
    }

    /// Apaga el pool: broadcast, join de todos los threads y cierre de los
    /// jobs que hayan quedado sin atender
    pub fn shutdown(mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
        }
        self.shared.cond.notify_all();

        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }

        // Los threads ya terminaron: cerrar las conexiones restantes
        let mut state = self.shared.state.lock().unwrap();
        state.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FileCache;
    use crate::logger::AccessLog;
    use crate::stats::SharedStats;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::PathBuf;
    use std::time::Duration;

    /// Contexto de worker contra un document root temporal con index.html
    fn test_context(name: &str) -> (Arc<WorkerContext>, PathBuf) {
        let mut root = std::env::temp_dir();
        root.push(format!("static_server_pool_test_{}_{}", std::process::id(), name));
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), b"<h1>Index Page</h1>").unwrap();

        let log_path = root.join("access.log");
        let ctx = Arc::new(WorkerContext {
            worker_id: 0,
            document_root: root.to_str().unwrap().to_string(),
            cache: Arc::new(FileCache::new(1 << 20)),
            log: Arc::new(AccessLog::open(&log_path).unwrap()),
            stats: Arc::new(SharedStats::new()),
        });

        (ctx, root)
    }

    fn roundtrip(pool: &ThreadPool, listener: &TcpListener, raw: &[u8]) -> String {
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();

        let (server_side, _) = listener.accept().unwrap();
        pool.submit(server_side).unwrap();

        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_pool_serves_requests() {
        let (ctx, _root) = test_context("serves");
        let pool = ThreadPool::new(2, 8, Arc::clone(&ctx));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();

        let response = roundtrip(&pool, &listener, b"GET /index.html HTTP/1.1\r\n\r\n");
        assert!(response.contains("200 OK"));
        assert!(response.contains("<h1>Index Page</h1>"));

        let response = roundtrip(&pool, &listener, b"GET /nada.html HTTP/1.1\r\n\r\n");
        assert!(response.contains("404 Not Found"));

        pool.shutdown();

        // Un request por cada conexión atendida
        assert_eq!(ctx.stats.snapshot().total_requests, 2);
    }

    #[test]
    fn test_submit_rejects_when_full() {
        let (ctx, _root) = test_context("full");

        // Pool sin threads: nada consume la cola
        let pool = ThreadPool::new(0, 1, Arc::clone(&ctx));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _c1 = TcpStream::connect(addr).unwrap();
        let _c2 = TcpStream::connect(addr).unwrap();
        let (s1, _) = listener.accept().unwrap();
        let (s2, _) = listener.accept().unwrap();

        assert!(pool.submit(s1).is_ok());
        assert_eq!(pool.job_count(), 1);

        // max_jobs = 1: el segundo se devuelve
        assert!(pool.submit(s2).is_err());

        pool.shutdown();
    }

    #[test]
    fn test_shutdown_joins_and_drains() {
        let (ctx, _root) = test_context("shutdown");
        let pool = ThreadPool::new(3, 8, Arc::clone(&ctx));

        // Shutdown sin jobs pendientes: los threads salen por el broadcast
        pool.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown_flag() {
        let (ctx, _root) = test_context("after");
        let pool = ThreadPool::new(0, 8, Arc::clone(&ctx));

        {
            let mut state = pool.shared.state.lock().unwrap();
            state.shutdown = true;
        }

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let _c = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (s, _) = listener.accept().unwrap();

        assert!(pool.submit(s).is_err());
        pool.shutdown();
    }
}
