//! # Construcción de Respuestas HTTP
//!
//! Este módulo proporciona una API para construir respuestas HTTP/1.1
//! de forma programática y enviarlas por el socket.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: RedUnix/1.1\r\n
//! Date: Sun, 02 Aug 2026 15:04:05 GMT\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 19\r\n
//! Connection: close\r\n
//! \r\n
//! <h1>Index Page</h1>
//! ```
//!
//! Toda respuesta del servidor incluye `Server`, `Date` (hora GMT),
//! `Content-Type`, `Content-Length` y `Connection: close` (el servidor no
//! mantiene conexiones persistentes).
//!
//! ## Ejemplo de uso
//!
//! ```
//! use static_server::http::{Response, StatusCode};
//!
//! let response = Response::standard(StatusCode::Ok)
//!     .with_header("Content-Type", "application/json")
//!     .with_body(r#"{"message": "Hello"}"#);
//!
//! let bytes = response.to_bytes();
//! // Ahora puedes enviar `bytes` por el socket
//! ```

use super::StatusCode;
use chrono::Utc;
use std::collections::HashMap;
use std::io::{self, Write};

/// Nombre que el servidor anuncia en el header `Server`
pub const SERVER_NAME: &str = "RedUnix/1.1";

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers HTTP (Content-Type, Content-Length, etc.)
    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Crea una respuesta con los headers obligatorios del servidor
    ///
    /// Pre-carga `Server`, `Date` (en GMT, formato RFC 1123) y
    /// `Connection: close`. `Content-Type` y `Content-Length` quedan a
    /// cargo del caller o de `with_body*`.
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::{Response, StatusCode};
    ///
    /// let response = Response::standard(StatusCode::Ok);
    /// assert!(response.headers().contains_key("Server"));
    /// assert!(response.headers().contains_key("Date"));
    /// ```
    pub fn standard(status: StatusCode) -> Self {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        Self::new(status)
            .with_header("Server", SERVER_NAME)
            .with_header("Date", &date)
            .with_header("Connection", "close")
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe, se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el cuerpo de la respuesta desde un string
    ///
    /// Automáticamente calcula y agrega el header `Content-Length`.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self.headers.insert(
            "Content-Length".to_string(),
            self.body.len().to_string()
        );
        self
    }

    /// Establece el cuerpo de la respuesta desde bytes
    ///
    /// Útil para respuestas binarias.
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers.insert(
            "Content-Length".to_string(),
            self.body.len().to_string()
        );
        self
    }

    /// Crea la respuesta de error estándar para un código
    ///
    /// El body usa la plantilla HTML fija de página de error (estilo
    /// NGINX), con el código numérico y la reason phrase.
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error_page(StatusCode::NotFound);
    /// let text = String::from_utf8(response.body().to_vec()).unwrap();
    /// assert!(text.contains("404 Not Found"));
    /// ```
    pub fn error_page(status: StatusCode) -> Self {
        let body = format!(
            "<html>\r\n\
             <head><title>{code} {reason}</title></head>\r\n\
             <body>\r\n\
             <center><h1>{code} {reason}</h1></center>\r\n\
             <hr><center>{server}</center>\r\n\
             </body>\r\n\
             </html>\r\n",
            code = status.as_u16(),
            reason = status.reason_phrase(),
            server = SERVER_NAME,
        );

        Self::standard(status)
            .with_header("Content-Type", "text/html")
            .with_body(&body)
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// Genera el formato completo:
    /// - Status line: `HTTP/1.1 200 OK\r\n`
    /// - Headers: `Header-Name: Value\r\n`
    /// - Línea vacía: `\r\n`
    /// - Body: contenido binario
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.header_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Genera solo la status line + headers + línea vacía
    fn header_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line
        let status_line = format!("HTTP/1.1 {}\r\n", self.status);
        result.extend_from_slice(status_line.as_bytes());

        // 2. Headers
        for (name, value) in &self.headers {
            let header_line = format!("{}: {}\r\n", name, value);
            result.extend_from_slice(header_line.as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");

        result
    }

    /// Escribe la respuesta en un stream
    ///
    /// Si `external_body` es Some, ese slice se envía como body en lugar
    /// del body propio (sirve para mandar contenido directamente desde un
    /// handle del cache sin copiarlo; el caller ya debe haber puesto el
    /// `Content-Length` correcto). Si `suppress_body` es true (requests
    /// HEAD) solo se envían los headers.
    ///
    /// Retorna la cantidad de bytes de body efectivamente enviados.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        external_body: Option<&[u8]>,
        suppress_body: bool,
    ) -> io::Result<usize> {
        writer.write_all(&self.header_bytes())?;

        if suppress_body {
            writer.flush()?;
            return Ok(0);
        }

        let body = external_body.unwrap_or(&self.body);
        writer.write_all(body)?;
        writer.flush()?;

        Ok(body.len())
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_standard_headers() {
        let response = Response::standard(StatusCode::Ok);

        assert_eq!(response.headers().get("Server"), Some(&SERVER_NAME.to_string()));
        assert_eq!(response.headers().get("Connection"), Some(&"close".to_string()));

        // El Date debe terminar en GMT (formato RFC 1123)
        let date = response.headers().get("Date").unwrap();
        assert!(date.ends_with("GMT"), "Date debe estar en GMT: {}", date);
    }

    #[test]
    fn test_with_body_sets_content_length() {
        let response = Response::new(StatusCode::Ok)
            .with_body("Hello World");

        assert_eq!(response.body(), b"Hello World");
        assert_eq!(response.headers().get("Content-Length"), Some(&"11".to_string()));
    }

    #[test]
    fn test_with_body_bytes() {
        let binary_data = vec![0x00, 0x01, 0x02, 0xFF];
        let response = Response::new(StatusCode::Ok)
            .with_body_bytes(binary_data.clone());

        assert_eq!(response.body(), &binary_data[..]);
        assert_eq!(response.headers().get("Content-Length"), Some(&"4".to_string()));
    }

    #[test]
    fn test_error_page_template() {
        let response = Response::error_page(StatusCode::NotFound);
        let text = String::from_utf8(response.body().to_vec()).unwrap();

        assert!(text.contains("<html>"));
        assert!(text.contains("404 Not Found"));
        assert!(text.contains(SERVER_NAME));
        assert_eq!(response.headers().get("Content-Type"), Some(&"text/html".to_string()));

        // Content-Length coincide con el body real
        let len: usize = response.headers().get("Content-Length").unwrap().parse().unwrap();
        assert_eq!(len, response.body().len());
    }

    #[test]
    fn test_to_bytes() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Type", "text/plain")
            .with_body("Test");

        let bytes = response.to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        // Verificar que contiene los elementos clave
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\nTest"));
    }

    #[test]
    fn test_write_to_external_body() {
        let response = Response::new(StatusCode::PartialContent)
            .with_header("Content-Length", "3");

        let mut out = Vec::new();
        let sent = response.write_to(&mut out, Some(b"234"), false).unwrap();

        assert_eq!(sent, 3);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 206 Partial Content\r\n"));
        assert!(text.ends_with("\r\n\r\n234"));
    }

    #[test]
    fn test_write_to_suppressed_body() {
        // HEAD: los headers van completos pero el body no se envía
        let response = Response::new(StatusCode::Ok).with_body("contenido");

        let mut out = Vec::new();
        let sent = response.write_to(&mut out, None, true).unwrap();

        assert_eq!(sent, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 9\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        assert!(!text.contains("contenido"));
    }
}
