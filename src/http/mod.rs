//! # Módulo HTTP
//!
//! Este módulo implementa la porción de HTTP/1.1 que el servidor de
//! archivos estáticos necesita, sin librerías de alto nivel:
//!
//! - Parsing de requests (método, path, versión, headers, `Range`)
//! - Construcción de responses con los headers obligatorios
//! - Páginas de error HTML con plantilla fija
//! - Manejo de status codes
//!
//! ### Formato de Request
//!
//! ```text
//! GET /index.html HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Range: bytes=0-99\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 206 Partial Content\r\n
//! Server: RedUnix/1.1\r\n
//! Date: Sun, 02 Aug 2026 15:04:05 GMT\r\n
//! Content-Type: application/octet-stream\r\n
//! Content-Range: bytes 0-99/4096\r\n
//! Content-Length: 100\r\n
//! Connection: close\r\n
//! \r\n
//! ...
//! ```
//!
//! Todas las conexiones se cierran al terminar la respuesta
//! (`Connection: close`); el servidor no implementa keep-alive.

// Submódulos del módulo HTTP
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
// Esto permite usar `http::Request` en vez de `http::request::Request`
pub use request::{ByteRange, Method, Request};
pub use response::{Response, SERVER_NAME};
pub use status::StatusCode;
