//! # Handler de Requests
//!
//! Ciclo de vida completo de una conexión HTTP:
//! leer → parsear → resolver → buscar en cache (o cargar) → responder →
//! cerrar. Cada conexión atendida produce exactamente una actualización de
//! estadísticas y una línea en el log de accesos, sin importar el
//! resultado.
//!
//! ## Resolución del recurso
//!
//! 1. `GET` o `HEAD`; cualquier otro método responde 405.
//! 2. `/api/stats` es el único endpoint especial: responde el snapshot de
//!    estadísticas en JSON.
//! 3. `/` se mapea a `/index.html`.
//! 4. Un path que contenga `..` responde 403 sin tocar el filesystem.
//! 5. El path relativo es la key del cache; el absoluto es
//!    `document_root + path`.
//! 6. En miss con archivo inexistente: 404. Error de lectura: 403 si fue
//!    permiso denegado, 500 en cualquier otro caso.
//! 7. Con header `Range` válido se responde 206 con `Content-Range`; un
//!    rango invertido o fuera de límites responde 416.

use crate::http::{Method, Request, Response, StatusCode};
use crate::mime;
use crate::server::worker::WorkerContext;
use crate::stats::StatsPayload;
use std::io::Read;
use std::net::TcpStream;
use std::path::Path;
use std::time::Instant;

/// Tamaño del buffer de lectura del request
const READ_BUF_SIZE: usize = 8192;

/// Resultado del ruteo: respuesta con body propio, o archivo servido
/// directamente desde un handle pinneado del cache
enum Routed<'a> {
    /// Respuesta con body propio (errores, JSON de stats)
    Plain(Response),

    /// Archivo cacheado; `range` son los límites inclusive si el request
    /// pidió un rango
    File {
        response: Response,
        handle: crate::cache::CacheHandle<'a>,
        range: Option<(u64, u64)>,
    },
}

/// Atiende una conexión de principio a fin
///
/// La conexión se cierra al salir (drop del stream); el handle del cache,
/// si se tomó, se libera también por drop en todos los caminos.
pub fn handle_connection(mut stream: TcpStream, ctx: &WorkerContext) {
    let start = Instant::now();
    ctx.stats.connection_opened();

    let peer_ip = stream
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "-".to_string());

    // Leer hasta el doble CRLF (o hasta llenar el buffer)
    let raw = match read_request(&mut stream) {
        Some(raw) => raw,
        None => {
            // Conexión cerrada sin mandar nada, o error de lectura: no hay
            // request que responder ni registrar
            ctx.stats.connection_closed();
            return;
        }
    };

    // Parsear; un request ilegible se responde 400 y se registra con
    // método UNKNOWN
    let (method_str, path_str, routed) = match Request::parse(&raw) {
        Ok(request) => {
            let method = request.method().as_str();
            let path = request.path().to_string();
            let routed = route(&request, ctx);
            (method, path, routed)
        }
        Err(_) => (
            "UNKNOWN",
            "-".to_string(),
            Routed::Plain(Response::error_page(StatusCode::BadRequest)),
        ),
    };

    let suppress_body = method_str == "HEAD";

    let (status, bytes_sent) = match routed {
        Routed::Plain(response) => {
            let sent = response
                .write_to(&mut stream, None, suppress_body)
                .unwrap_or(0);
            (response.status(), sent)
        }
        Routed::File {
            response,
            handle,
            range,
        } => {
            let body = match range {
                Some((first, last)) => &handle.data()[first as usize..=last as usize],
                None => handle.data(),
            };
            let sent = response
                .write_to(&mut stream, Some(body), suppress_body)
                .unwrap_or(0);
            (response.status(), sent)
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    ctx.stats
        .update(status.as_u16(), bytes_sent as u64, duration_ms);
    ctx.log.log(
        &peer_ip,
        method_str,
        &path_str,
        status.as_u16(),
        bytes_sent,
        duration_ms,
    );
    ctx.stats.connection_closed();
}

/// Lee del socket hasta ver `\r\n\r\n` o llenar el buffer
///
/// Retorna None si la conexión se cerró antes de completar un request o si
/// hubo error de lectura.
fn read_request(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut total = 0;

    loop {
        if total == buf.len() {
            // Buffer lleno sin terminador: se intenta parsear lo leído
            break;
        }

        match stream.read(&mut buf[total..]) {
            Ok(0) => return None,
            Ok(n) => {
                total += n;
                if buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return None,
        }
    }

    Some(buf[..total].to_vec())
}

/// Resuelve el request a una respuesta
fn route<'a>(request: &Request, ctx: &'a WorkerContext) -> Routed<'a> {
    // Solo GET y HEAD; el resto responde 405
    if !matches!(request.method(), Method::GET | Method::HEAD) {
        return Routed::Plain(Response::error_page(StatusCode::MethodNotAllowed));
    }

    // Endpoint especial de estadísticas
    if request.path() == "/api/stats" {
        return Routed::Plain(stats_response(ctx));
    }

    // Mapeo del path: "/" sirve el índice
    let path = if request.path() == "/" {
        "/index.html".to_string()
    } else {
        request.path().to_string()
    };

    // Cualquier ".." en el path es un intento de traversal: 403 sin tocar
    // el filesystem
    if path.contains("..") {
        return Routed::Plain(Response::error_page(StatusCode::Forbidden));
    }

    // Path absoluto por concatenación con el document root
    let abs_path = format!("{}{}", ctx.document_root, path);

    // Cache: hit directo, o probe + load en miss
    let handle = match ctx.cache.acquire(&path) {
        Some(handle) => handle,
        None => {
            if !Path::new(&abs_path).exists() {
                return Routed::Plain(Response::error_page(StatusCode::NotFound));
            }

            match ctx.cache.load(&path, Path::new(&abs_path)) {
                Ok(handle) => handle,
                Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return Routed::Plain(Response::error_page(StatusCode::Forbidden));
                }
                Err(_) => {
                    return Routed::Plain(Response::error_page(StatusCode::InternalServerError));
                }
            }
        }
    };

    let size = handle.size() as u64;
    let content_type = mime::content_type_for(&path);

    // Manejo de Range: 206 con Content-Range, o 416 si no es satisfacible
    if let Some(range) = request.byte_range() {
        return match range.resolve(size) {
            Ok((first, last)) => {
                let length = last - first + 1;
                let response = Response::standard(StatusCode::PartialContent)
                    .with_header("Content-Type", &content_type)
                    .with_header("Content-Range", &format!("bytes {}-{}/{}", first, last, size))
                    .with_header("Content-Length", &length.to_string());

                Routed::File {
                    response,
                    handle,
                    range: Some((first, last)),
                }
            }
            Err(()) => {
                let response = Response::error_page(StatusCode::RangeNotSatisfiable)
                    .with_header("Content-Range", &format!("bytes */{}", size));
                Routed::Plain(response)
            }
        };
    }

    // Respuesta completa
    let response = Response::standard(StatusCode::Ok)
        .with_header("Content-Type", &content_type)
        .with_header("Content-Length", &size.to_string());

    Routed::File {
        response,
        handle,
        range: None,
    }
}

/// Arma la respuesta JSON de `/api/stats`
fn stats_response(ctx: &WorkerContext) -> Response {
    let payload = StatsPayload::build(&ctx.stats.snapshot(), &ctx.cache.stats());

    match serde_json::to_string(&payload) {
        Ok(json) => Response::standard(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body(&json),
        Err(_) => Response::error_page(StatusCode::InternalServerError),
    }
}
