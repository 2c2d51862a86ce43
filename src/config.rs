//! # Configuración del Servidor
//!
//! Este módulo define la configuración del servidor de archivos estáticos.
//! La línea de comandos recibe un único argumento posicional: la ruta del
//! archivo de configuración (default `server.conf`).
//!
//! ## Formato del archivo
//!
//! Texto orientado a líneas `KEY=VALUE`; las líneas en blanco y las que
//! empiezan con `#` se ignoran, igual que las keys desconocidas.
//!
//! ```text
//! # server.conf
//! PORT=8080
//! DOCUMENT_ROOT=www
//! NUM_WORKERS=2
//! THREADS_PER_WORKER=10
//! MAX_QUEUE_SIZE=100
//! LOG_FILE=logs/access.log
//! CACHE_SIZE_MB=64
//! TIMEOUT_SECONDS=30
//! ```
//!
//! Si el archivo default no existe, el servidor arranca con los valores
//! default; un archivo pasado explícitamente que no existe sí es un error
//! fatal de arranque.

use clap::Parser;
use std::fs;
use std::path::Path;

/// Ruta default del archivo de configuración
pub const DEFAULT_CONFIG_PATH: &str = "server.conf";

/// Argumentos de línea de comandos
#[derive(Debug, Parser)]
#[command(name = "static_server")]
#[command(about = "Servidor HTTP/1.1 concurrente de archivos estáticos")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Ruta del archivo de configuración
    #[arg(default_value = DEFAULT_CONFIG_PATH, env = "SERVER_CONF")]
    pub config: String,
}

/// Configuración efectiva del servidor
#[derive(Debug, Clone)]
pub struct Config {
    /// Puerto TCP en el que escucha el servidor
    pub port: u16,

    /// Raíz del filesystem desde donde se sirven archivos
    pub document_root: String,

    /// Cantidad de workers
    pub num_workers: usize,

    /// Threads del pool de cada worker
    pub threads_per_worker: usize,

    /// Capacidad de la cola de admisión (conexiones pendientes de entrega)
    pub max_queue_size: usize,

    /// Ruta del log de accesos
    pub log_file: String,

    /// Tamaño total de cache en MB (se reparte entre los workers)
    pub cache_size_mb: usize,

    /// Timeout por request en segundos (reservado, no se aplica todavía)
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            document_root: "www".to_string(),
            num_workers: 2,
            threads_per_worker: 10,
            max_queue_size: 100,
            log_file: "logs/access.log".to_string(),
            cache_size_mb: 64,
            timeout_seconds: 30,
        }
    }
}

/// Errores de carga de configuración
#[derive(Debug)]
pub enum ConfigError {
    /// No se pudo leer el archivo
    Io(String, std::io::Error),

    /// Un valor no se pudo interpretar (ej: PORT=abc)
    InvalidValue { key: String, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "no se pudo leer '{}': {}", path, e),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "valor inválido para {}: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Carga la configuración desde un archivo
    ///
    /// Si `path` es la ruta default y el archivo no existe, retorna la
    /// configuración default; si la ruta fue dada explícitamente y no
    /// existe, es un error.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() && path == DEFAULT_CONFIG_PATH {
            println!("[*] {} no existe, usando configuración default", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_string(), e))?;

        Self::from_text(&contents)
    }

    /// Parsea el contenido `KEY=VALUE` de un archivo de configuración
    ///
    /// Keys desconocidas se ignoran; un valor numérico que no parsea es
    /// error.
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::config::Config;
    ///
    /// let config = Config::from_text("PORT=9000\n# comentario\n").unwrap();
    /// assert_eq!(config.port, 9000);
    /// assert_eq!(config.num_workers, 2); // default
    /// ```
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in text.lines() {
            let line = line.trim();

            // Saltar comentarios y líneas vacías
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => continue,
            };

            match key {
                "PORT" => config.port = Self::parse_number(key, value)?,
                "DOCUMENT_ROOT" => config.document_root = value.to_string(),
                "NUM_WORKERS" => config.num_workers = Self::parse_number(key, value)?,
                "THREADS_PER_WORKER" => {
                    config.threads_per_worker = Self::parse_number(key, value)?
                }
                "MAX_QUEUE_SIZE" => config.max_queue_size = Self::parse_number(key, value)?,
                "LOG_FILE" => config.log_file = value.to_string(),
                "CACHE_SIZE_MB" => config.cache_size_mb = Self::parse_number(key, value)?,
                "TIMEOUT_SECONDS" => config.timeout_seconds = Self::parse_number(key, value)?,
                // Keys desconocidas se ignoran
                _ => {}
            }
        }

        Ok(config)
    }

    fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
        value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Valida que la configuración sea utilizable
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("PORT debe ser mayor que 0".to_string());
        }
        if self.num_workers == 0 {
            return Err("NUM_WORKERS debe ser al menos 1".to_string());
        }
        if self.threads_per_worker == 0 {
            return Err("THREADS_PER_WORKER debe ser al menos 1".to_string());
        }
        if self.max_queue_size == 0 {
            return Err("MAX_QUEUE_SIZE debe ser al menos 1".to_string());
        }
        if self.document_root.is_empty() {
            return Err("DOCUMENT_ROOT no puede ser vacío".to_string());
        }
        if self.log_file.is_empty() {
            return Err("LOG_FILE no puede ser vacío".to_string());
        }
        Ok(())
    }

    /// Dirección de escucha (todas las interfaces)
    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Capacidad de cache por worker en bytes
    ///
    /// El total `CACHE_SIZE_MB` se reparte entre los workers, con un piso
    /// de 1 MiB por worker.
    pub fn per_worker_cache_bytes(&self) -> usize {
        let total = self.cache_size_mb * (1 << 20);
        let per_worker = total / self.num_workers.max(1);
        per_worker.max(1 << 20)
    }

    /// Imprime un resumen de la configuración efectiva
    pub fn print_summary(&self) {
        println!("Configuración:");
        println!("  Puerto:             {}", self.port);
        println!("  Document root:      {}", self.document_root);
        println!("  Workers:            {}", self.num_workers);
        println!("  Threads por worker: {}", self.threads_per_worker);
        println!("  Cola de admisión:   {}", self.max_queue_size);
        println!("  Log de accesos:     {}", self.log_file);
        println!(
            "  Cache:              {} MB total ({} MB por worker)",
            self.cache_size_mb,
            self.per_worker_cache_bytes() >> 20
        );
        println!("  Timeout:            {} s (reservado)", self.timeout_seconds);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.document_root, "www");
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.threads_per_worker, 10);
        assert_eq!(config.max_queue_size, 100);
        assert_eq!(config.log_file, "logs/access.log");
        assert_eq!(config.cache_size_mb, 64);
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_text_full() {
        let text = "\
# configuración de prueba
PORT=9090
DOCUMENT_ROOT=/srv/www
NUM_WORKERS=4
THREADS_PER_WORKER=8

MAX_QUEUE_SIZE=50
LOG_FILE=/tmp/acc.log
CACHE_SIZE_MB=128
TIMEOUT_SECONDS=60
";
        let config = Config::from_text(text).unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.document_root, "/srv/www");
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.threads_per_worker, 8);
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.log_file, "/tmp/acc.log");
        assert_eq!(config.cache_size_mb, 128);
        assert_eq!(config.timeout_seconds, 60);
    }

    #[test]
    fn test_from_text_partial_keeps_defaults() {
        let config = Config::from_text("PORT=9000\n").unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.num_workers, 2);
        assert_eq!(config.document_root, "www");
    }

    #[test]
    fn test_from_text_ignores_unknown_keys() {
        let config = Config::from_text("COLOR=azul\nPORT=9000\n").unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_from_text_whitespace_around_key_and_value() {
        let config = Config::from_text("  PORT = 9000  \n").unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_from_text_invalid_number() {
        let result = Config::from_text("PORT=ochenta\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("static_server_conf_test_{}.conf", std::process::id()));

        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "PORT=9191").unwrap();
        writeln!(f, "NUM_WORKERS=3").unwrap();
        drop(f);

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.num_workers, 3);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Config::load("/ruta/inexistente/servidor.conf");
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = Config::default();
        config.num_workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.threads_per_worker = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_queue_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_per_worker_cache_floor() {
        // 64 MB / 2 workers = 32 MB por worker
        let config = Config::default();
        assert_eq!(config.per_worker_cache_bytes(), 32 << 20);

        // 2 MB / 8 workers daría 256 KiB: aplica el piso de 1 MiB
        let mut config = Config::default();
        config.cache_size_mb = 2;
        config.num_workers = 8;
        assert_eq!(config.per_worker_cache_bytes(), 1 << 20);
    }
}
