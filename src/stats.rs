//! # Estadísticas del Servidor
//!
//! Contadores globales de requests, bytes, códigos de estado y tiempo de
//! respuesta acumulado, compartidos por todos los workers y protegidos por
//! un único mutex. El master imprime un reporte periódico y el endpoint
//! `/api/stats` expone el mismo snapshot en JSON junto con las
//! estadísticas del cache del worker que atiende el request.

use crate::cache::CacheStats;
use serde::Serialize;

/// Contadores acumulados del servidor
///
/// Todos son monótonamente no-decrecientes salvo `active_connections`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStats {
    /// Total de requests atendidos (uno por conexión aceptada con request)
    pub total_requests: u64,

    /// Total de bytes de body transferidos
    pub bytes_transferred: u64,

    /// Respuestas 200 OK
    pub status_200: u64,

    /// Respuestas 404 Not Found
    pub status_404: u64,

    /// Respuestas 500 Internal Server Error
    pub status_500: u64,

    /// Suma de los tiempos de respuesta en milisegundos
    pub total_response_time_ms: u64,

    /// Conexiones siendo atendidas en este momento
    pub active_connections: u64,
}

impl ServerStats {
    /// Tiempo de respuesta promedio en milisegundos (0 si no hubo requests)
    pub fn avg_response_time_ms(&self) -> u64 {
        if self.total_requests == 0 {
            0
        } else {
            self.total_response_time_ms / self.total_requests
        }
    }
}

/// Contenedor thread-safe de [`ServerStats`]
pub struct SharedStats {
    inner: std::sync::Mutex<ServerStats>,
}

impl SharedStats {
    /// Crea el bloque de estadísticas en cero
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(ServerStats::default()),
        }
    }

    /// Registra un request completado
    ///
    /// Incrementa el total, los bytes y el tiempo acumulado; los contadores
    /// por código solo distinguen 200, 404 y 500 (el resto de códigos
    /// cuenta para el total igualmente).
    pub fn update(&self, status: u16, bytes: u64, duration_ms: u64) {
        let mut stats = self.inner.lock().unwrap();

        stats.total_requests += 1;
        stats.bytes_transferred += bytes;
        stats.total_response_time_ms += duration_ms;

        match status {
            200 => stats.status_200 += 1,
            404 => stats.status_404 += 1,
            500 => stats.status_500 += 1,
            _ => {}
        }
    }

    /// Marca el inicio de atención de una conexión
    pub fn connection_opened(&self) {
        let mut stats = self.inner.lock().unwrap();
        stats.active_connections += 1;
    }

    /// Marca el fin de atención de una conexión
    pub fn connection_closed(&self) {
        let mut stats = self.inner.lock().unwrap();
        if stats.active_connections > 0 {
            stats.active_connections -= 1;
        }
    }

    /// Copia consistente de los contadores actuales
    pub fn snapshot(&self) -> ServerStats {
        *self.inner.lock().unwrap()
    }

    /// Imprime el reporte periódico en consola
    pub fn print(&self) {
        let stats = self.snapshot();

        let avg = if stats.total_requests > 0 {
            stats.total_response_time_ms as f64 / stats.total_requests as f64
        } else {
            0.0
        };

        println!("\n--- Estadísticas del Servidor ---");
        println!("Requests totales: {}", stats.total_requests);
        println!("Bytes transferidos: {}", stats.bytes_transferred);
        println!("Tiempo de respuesta promedio: {:.2} ms", avg);
        println!(
            "Códigos de estado: [200: {}] [404: {}] [500: {}]",
            stats.status_200, stats.status_404, stats.status_500
        );
        println!("Conexiones activas: {}", stats.active_connections);
        println!("---------------------------------");
    }
}

impl Default for SharedStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload JSON del endpoint `/api/stats`
#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub total_requests: u64,
    pub bytes_transferred: u64,
    pub active_connections: u64,
    pub avg_response_time_ms: u64,
    pub status_codes: StatusCodesPayload,
    pub cache: CachePayload,
}

/// Sub-objeto `status_codes` del payload
#[derive(Debug, Serialize)]
pub struct StatusCodesPayload {
    #[serde(rename = "200")]
    pub ok: u64,

    #[serde(rename = "404")]
    pub not_found: u64,

    #[serde(rename = "500")]
    pub internal_error: u64,
}

/// Sub-objeto `cache` del payload
#[derive(Debug, Serialize)]
pub struct CachePayload {
    pub items: usize,
    pub bytes_used: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,

    /// Porcentaje de hits en [0, 100], redondeado a dos decimales
    pub hit_rate: f64,
}

impl StatsPayload {
    /// Arma el payload a partir de un snapshot del servidor y del cache
    pub fn build(stats: &ServerStats, cache: &CacheStats) -> Self {
        Self {
            total_requests: stats.total_requests,
            bytes_transferred: stats.bytes_transferred,
            active_connections: stats.active_connections,
            avg_response_time_ms: stats.avg_response_time_ms(),
            status_codes: StatusCodesPayload {
                ok: stats.status_200,
                not_found: stats.status_404,
                internal_error: stats.status_500,
            },
            cache: CachePayload {
                items: cache.items,
                bytes_used: cache.bytes_used,
                capacity: cache.capacity,
                hits: cache.hits,
                misses: cache.misses,
                evictions: cache.evictions,
                hit_rate: (cache.hit_rate() * 100.0).round() / 100.0,
            },
        }
    }
}
