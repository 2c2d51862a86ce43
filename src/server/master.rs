//! # Master (acceptor + dispatcher)
//!
//! El master es el dueño del socket de escucha: acepta conexiones, las
//! admite contra la cola acotada y las reparte round-robin entre los
//! workers por sus canales. Si la cola de admisión está saturada la
//! conexión se rechaza en el momento con un 503 escrito directamente.
//!
//! ## Secuencia de despacho
//!
//! 1. `accept`.
//! 2. Decremento **no bloqueante** de `empty_slots`; si falla → 503.
//! 3. Insertar el token bajo el mutex del ring y publicar `filled_slots`.
//! 4. Elegir el worker `w = rr; rr = (rr + 1) % N` y enviarle la conexión
//!    por su canal.
//!
//! Si el envío al canal falla, la conexión se cierra localmente, se
//! registra el error y se drena un token para devolver el slot reservado.
//!
//! ## Apagado
//!
//! SIGINT/SIGTERM (o el [`ShutdownHandle`]) cortan el loop de accept. El
//! master cierra el listener, descarta los senders (con eso cada worker
//! termina su loop y apaga su pool), espera el join de todos los workers y
//! de la impresora de estadísticas, imprime el reporte final y baja el log
//! a disco.

use crate::config::Config;
use crate::logger::AccessLog;
use crate::server::queue::{AdmissionQueue, AdmissionToken};
use crate::server::signal;
use crate::server::worker::{self, WorkerContext};
use crate::stats::SharedStats;
use crate::cache::FileCache;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Intervalo del reporte periódico de estadísticas
const STATS_PRINT_INTERVAL_SECS: u64 = 30;

/// Servidor HTTP concurrente de archivos estáticos
pub struct Server {
    config: Config,
    listener: Option<TcpListener>,
    running: Arc<AtomicBool>,
}

/// Handle para pedir el apagado graceful desde otro thread
///
/// Prende el flag y hace una conexión de cortesía al listener para
/// despertar al accept bloqueado.
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    addr: Option<SocketAddr>,
}

impl ShutdownHandle {
    /// Pide el apagado del servidor
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);

        // Despertar al accept con una conexión que el master descarta
        if let Some(addr) = self.addr {
            let wake_addr = SocketAddr::new("127.0.0.1".parse().unwrap(), addr.port());
            let _ = TcpStream::connect_timeout(&wake_addr, Duration::from_secs(1));
        }
    }
}

impl Server {
    /// Crea el servidor con la configuración dada (sin abrir el socket)
    pub fn new(config: Config) -> Self {
        Self {
            config,
            listener: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Abre el socket de escucha (idempotente)
    ///
    /// Separado de `run` para que los tests puedan conocer el puerto
    /// efectivo antes de arrancar el loop (con `PORT=0` el sistema asigna
    /// uno libre).
    pub fn bind(&mut self) -> io::Result<()> {
        if self.listener.is_none() {
            let listener = TcpListener::bind(self.config.address())?;
            self.listener = Some(listener);
        }
        Ok(())
    }

    /// Dirección efectiva de escucha (disponible después de `bind`)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Handle de apagado para usar desde otro thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
            addr: self.local_addr(),
        }
    }

    /// Corre el servidor hasta el apagado graceful
    ///
    /// Retorna recién cuando todos los workers terminaron.
    ///
    /// # Errores
    ///
    /// Propaga los errores fatales de arranque (bind del socket, apertura
    /// del log); los errores por conexión solo se registran.
    pub fn run(&mut self) -> io::Result<()> {
        self.bind()?;
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err(io::Error::new(io::ErrorKind::Other, "listener no disponible")),
        };
        let addr = listener.local_addr()?;

        // Recursos compartidos del grupo de workers
        let log = Arc::new(AccessLog::open(&self.config.log_file)?);
        let stats = Arc::new(SharedStats::new());
        let queue = Arc::new(AdmissionQueue::new(self.config.max_queue_size));

        let num_workers = self.config.num_workers;
        let per_worker_cache = self.config.per_worker_cache_bytes();

        // Arrancar los workers, cada uno con su canal y su cache privado
        let mut senders = Vec::with_capacity(num_workers);
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel::<TcpStream>();

            let ctx = Arc::new(WorkerContext {
                worker_id,
                document_root: self.config.document_root.clone(),
                cache: Arc::new(FileCache::new(per_worker_cache)),
                log: Arc::clone(&log),
                stats: Arc::clone(&stats),
            });

            let queue = Arc::clone(&queue);
            let threads = self.config.threads_per_worker;
            let max_jobs = self.config.max_queue_size;

            let handle = thread::Builder::new()
                .name(format!("worker-{}", worker_id))
                .spawn(move || worker::worker_main(rx, queue, ctx, threads, max_jobs))?;

            senders.push(tx);
            workers.push(handle);
        }

        // Reporte periódico de estadísticas
        let printer = {
            let stats = Arc::clone(&stats);
            let running = Arc::clone(&self.running);
            thread::Builder::new()
                .name("stats-printer".to_string())
                .spawn(move || stats_printer(stats, running))?
        };

        println!("[+] Servidor escuchando en {}", addr);
        println!(
            "[*] {} workers x {} threads, cola de admisión de {}\n",
            num_workers, self.config.threads_per_worker, self.config.max_queue_size
        );

        // Loop de accept con despacho round-robin
        let mut rr = 0;
        while self.running.load(Ordering::SeqCst) && !signal::shutdown_requested() {
            let (stream, _peer) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    // EINTR por señal: la condición del while decide
                    continue;
                }
                Err(e) => {
                    eprintln!("[!] Error en accept: {}", e);
                    continue;
                }
            };

            // Pudo ser la conexión de cortesía del shutdown
            if !self.running.load(Ordering::SeqCst) || signal::shutdown_requested() {
                break;
            }

            // Admisión no bloqueante: cola llena → 503 inmediato
            if !queue.try_admit(AdmissionToken::for_worker(rr)) {
                worker::reject_with_503(stream);
                continue;
            }

            // Entregar la conexión al worker elegido
            if let Err(e) = senders[rr].send(stream) {
                // El worker no está: cerrar la conexión localmente y
                // devolver el slot reservado drenando un token
                eprintln!("[!] Worker {} no disponible: {}", rr, e);
                let _ = queue.take();
            }

            rr = (rr + 1) % num_workers;
        }

        println!("[*] Apagando servidor...");

        // Dejar de aceptar y avisar a los workers cerrando los canales
        drop(listener);
        drop(senders);

        for handle in workers {
            let _ = handle.join();
        }

        self.running.store(false, Ordering::SeqCst);
        let _ = printer.join();

        stats.print();
        log.flush();

        println!("[+] Servidor detenido");
        Ok(())
    }
}

/// Thread del reporte periódico: imprime las estadísticas cada 30 s
///
/// Duerme de a un segundo para poder observar el flag de apagado sin
/// demorar el join del master.
fn stats_printer(stats: Arc<SharedStats>, running: Arc<AtomicBool>) {
    let mut ticks = 0u64;

    while running.load(Ordering::SeqCst) && !signal::shutdown_requested() {
        thread::sleep(Duration::from_secs(1));
        ticks += 1;

        if ticks >= STATS_PRINT_INTERVAL_SECS {
            stats.print();
            ticks = 0;
        }
    }
}
