//! # Log de Accesos
//!
//! Log de accesos único y append-only, compartido por todos los workers,
//! con rotación automática por tamaño.
//!
//! ## Formato de línea
//!
//! ```text
//! 127.0.0.1 [02/Aug/2026:12:00:00] "GET /index.html" 200 21 5ms
//! ```
//!
//! La fecha va en hora local con formato `DD/Mon/YYYY:HH:MM:SS`.
//!
//! ## Buffering y rotación
//!
//! Las líneas se acumulan en un buffer en memoria de 4 KiB y se bajan a
//! disco cuando: (a) la próxima línea no cabe en el buffer, (b) pasaron 5
//! segundos desde el último flush, (c) va a ocurrir una rotación, o (d) el
//! logger se está cerrando. Antes de cada escritura se consulta el tamaño
//! del archivo en disco: si alcanzó los 10 MiB se rota
//! (`access.log` → `access.log.1` → ... → `access.log.5`, el más viejo se
//! elimina).
//!
//! Un error de escritura se reporta por stderr y la línea se descarta; el
//! request que la originó no se ve afectado.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tamaño del buffer de líneas en memoria
const LOG_BUF_CAPACITY: usize = 4096;

/// Tiempo máximo que una línea puede esperar en el buffer
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Tamaño en disco que dispara la rotación: 10 MiB
const LOG_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Cantidad de archivos de historial que se conservan
const LOG_MAX_ROTATIONS: usize = 5;

/// Estado mutable del logger, protegido por el mutex de [`AccessLog`]
struct LogInner {
    file: File,
    buf: Vec<u8>,
    last_flush: Instant,
}

/// Log de accesos compartido, con buffer y rotación por tamaño
pub struct AccessLog {
    path: PathBuf,
    max_size: u64,
    max_rotations: usize,
    inner: Mutex<LogInner>,
}

impl AccessLog {
    /// Abre (o crea) el log en modo append, creando el directorio padre
    /// si no existe
    ///
    /// # Errores
    ///
    /// Propaga el error de I/O si el archivo no se puede abrir; el server
    /// lo trata como error fatal de arranque.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::with_limits(path, LOG_MAX_SIZE, LOG_MAX_ROTATIONS)
    }

    /// Variante con límites configurables de rotación
    ///
    /// La usa `open` con los valores default (10 MiB, 5 archivos); los
    /// tests la usan con límites chicos para ejercitar la rotación.
    pub fn with_limits<P: AsRef<Path>>(
        path: P,
        max_size: u64,
        max_rotations: usize,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            max_size,
            max_rotations,
            inner: Mutex::new(LogInner {
                file,
                buf: Vec::with_capacity(LOG_BUF_CAPACITY),
                last_flush: Instant::now(),
            }),
        })
    }

    /// Registra un acceso
    ///
    /// Formato: `IP [FECHA] "METODO PATH" STATUS BYTES DURACIONms`
    pub fn log(
        &self,
        ip: &str,
        method: &str,
        path: &str,
        status: u16,
        bytes: usize,
        duration_ms: u64,
    ) {
        let date = Local::now().format("%d/%b/%Y:%H:%M:%S");
        let line = format!(
            "{} [{}] \"{} {}\" {} {} {}ms\n",
            ip, date, method, path, status, bytes, duration_ms
        );

        let mut inner = self.inner.lock().unwrap();

        // Rotación por tamaño en disco, antes de escribir
        let size_now = inner.file.metadata().map(|m| m.len()).unwrap_or(0);
        if size_now >= self.max_size {
            self.rotate(&mut inner);
        }

        // Si la línea no cabe en el buffer, bajar lo acumulado primero
        if inner.buf.len() + line.len() > LOG_BUF_CAPACITY {
            Self::flush_inner(&mut inner);
        }

        inner.buf.extend_from_slice(line.as_bytes());

        if inner.last_flush.elapsed() >= FLUSH_INTERVAL {
            Self::flush_inner(&mut inner);
        }
    }

    /// Baja el buffer a disco inmediatamente
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        Self::flush_inner(&mut inner);
    }

    fn flush_inner(inner: &mut LogInner) {
        if !inner.buf.is_empty() {
            if let Err(e) = inner.file.write_all(&inner.buf) {
                eprintln!("logger: fallo de escritura en el log de accesos: {}", e);
            }
            inner.buf.clear();
        }
        inner.last_flush = Instant::now();
    }

    /// Rota los archivos: `log` → `log.1` → ... → `log.K`
    ///
    /// El más viejo (`log.K`) se elimina, el principal se renombra a
    /// `log.1` y se reabre vacío.
    fn rotate(&self, inner: &mut LogInner) {
        Self::flush_inner(inner);

        let oldest = format!("{}.{}", self.path.display(), self.max_rotations);
        let _ = fs::remove_file(&oldest);

        for i in (1..self.max_rotations).rev() {
            let from = format!("{}.{}", self.path.display(), i);
            let to = format!("{}.{}", self.path.display(), i + 1);
            let _ = fs::rename(&from, &to);
        }

        let rotated = format!("{}.1", self.path.display());
        let _ = fs::rename(&self.path, &rotated);

        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => inner.file = file,
            Err(e) => {
                // Se mantiene el handle anterior: las líneas siguen yendo
                // al archivo rotado en lugar de perderse
                eprintln!("logger: no se pudo reabrir {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for AccessLog {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn temp_log_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("static_server_log_test_{}_{}", std::process::id(), name));
        // Arrancar siempre de cero
        let _ = fs::remove_file(&path);
        for i in 1..=LOG_MAX_ROTATIONS {
            let _ = fs::remove_file(format!("{}.{}", path.display(), i));
        }
        path
    }

    /// Valida la forma `IP [FECHA] "METODO PATH" STATUS BYTES DURACIONms`
    fn assert_line_format(line: &str) {
        let (ip, rest) = line.split_once(' ').expect("falta el separador IP");
        assert!(!ip.is_empty());

        assert!(rest.starts_with('['), "falta '[': {}", line);
        let (date, rest) = rest[1..].split_once("] ").expect("falta '] '");
        assert!(!date.is_empty() && !date.contains(']'));

        assert!(rest.starts_with('"'), "falta la comilla inicial: {}", line);
        let (req, rest) = rest[1..].split_once("\" ").expect("falta la comilla final");
        let mut req_parts = req.split(' ');
        let method = req_parts.next().unwrap();
        assert!(method.chars().all(|c| c.is_ascii_uppercase()));
        assert!(req_parts.next().is_some(), "falta el path: {}", line);

        let fields: Vec<&str> = rest.split(' ').collect();
        assert_eq!(fields.len(), 3, "campos finales: {}", line);
        fields[0].parse::<u16>().expect("status no numérico");
        fields[1].parse::<u64>().expect("bytes no numérico");
        let dur = fields[2].strip_suffix("ms").expect("falta el sufijo ms");
        dur.parse::<u64>().expect("duración no numérica");
    }

    #[test]
    fn test_line_format() {
        let path = temp_log_path("format");
        let log = AccessLog::open(&path).unwrap();

        log.log("127.0.0.1", "GET", "/index.html", 200, 21, 5);
        log.log("10.0.0.9", "HEAD", "/hello.bin", 404, 162, 0);
        log.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        assert!(lines[0].starts_with("127.0.0.1 ["));
        assert!(lines[0].contains("\"GET /index.html\" 200 21 5ms"));
        for line in &lines {
            assert_line_format(line);
        }
    }

    #[test]
    fn test_lines_buffered_until_flush() {
        let path = temp_log_path("buffered");
        let log = AccessLog::open(&path).unwrap();

        log.log("127.0.0.1", "GET", "/a", 200, 1, 1);

        // La línea quedó en el buffer, no en disco
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.is_empty());

        log.flush();
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("\"GET /a\""));
    }

    #[test]
    fn test_drop_flushes() {
        let path = temp_log_path("drop");
        {
            let log = AccessLog::open(&path).unwrap();
            log.log("127.0.0.1", "GET", "/final", 200, 3, 2);
        }

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("\"GET /final\""));
    }

    #[test]
    fn test_rotation_by_size() {
        let path = temp_log_path("rotate");
        let log = AccessLog::with_limits(&path, 200, 2).unwrap();

        // Superar los 200 bytes en disco a fuerza de flushes
        for i in 0..6 {
            log.log("127.0.0.1", "GET", &format!("/archivo_{}.html", i), 200, 1024, 3);
            log.flush();
        }

        // El historial .1 debe existir y el principal quedar chico
        let rotated = format!("{}.1", path.display());
        assert!(fs::metadata(&rotated).is_ok(), "no se creó {}", rotated);

        let main_size = fs::metadata(&path).unwrap().len();
        assert!(
            main_size < 200 + 100,
            "el principal quedó muy grande tras rotar: {} bytes",
            main_size
        );
    }

    #[test]
    fn test_rotation_retention_ladder() {
        let path = temp_log_path("ladder");
        let log = AccessLog::with_limits(&path, 80, 3).unwrap();

        // Forzar varias rotaciones
        for i in 0..20 {
            log.log("127.0.0.1", "GET", &format!("/pagina_{:04}", i), 200, 512, 1);
            log.flush();
        }
        drop(log);

        // Nunca debe existir un .4 (la retención es 3)
        assert!(fs::metadata(format!("{}.1", path.display())).is_ok());
        assert!(fs::metadata(format!("{}.4", path.display())).is_err());
    }

    #[test]
    fn test_concurrent_writers_no_interleaving() {
        let path = temp_log_path("concurrent");
        let log = AccessLog::open(&path).unwrap();

        thread::scope(|s| {
            for t in 0..4 {
                let log = &log;
                s.spawn(move || {
                    for i in 0..50 {
                        log.log("10.0.0.1", "GET", &format!("/t{}/r{}", t, i), 200, 64, 1);
                    }
                });
            }
        });
        log.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in &lines {
            assert_line_format(line);
        }
    }
}
