//! # Parsing de Requests HTTP/1.1
//!
//! Este módulo implementa el parser HTTP del servidor de archivos estáticos.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /index.html HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Range: bytes=0-99\r\n
//! \r\n
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path VERSION`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que separa headers del body
//!
//! El servidor solo sirve contenido estático, así que únicamente el método,
//! el path, la versión y el header `Range` son semánticamente relevantes;
//! el resto de headers se conserva en un mapa por si algún handler los
//! necesita.

use std::collections::HashMap;

/// Métodos HTTP reconocidos por el parser
///
/// El handler solo acepta GET y HEAD; los demás producen 405, pero deben
/// poder parsearse para que la respuesta sea 405 y no 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - No soportado por el servidor estático (responde 405)
    POST,

    /// PUT - No soportado (responde 405)
    PUT,

    /// DELETE - No soportado (responde 405)
    DELETE,

    /// OPTIONS - No soportado (responde 405)
    OPTIONS,
}

impl Method {
    /// Parsea un método HTTP desde un string
    ///
    /// # Errores
    ///
    /// Retorna error si el token no corresponde a ningún método conocido
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::UnknownMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP (GET, HEAD, ...)
    method: Method,

    /// Path de la petición sin query string (ej: "/index.html")
    path: String,

    /// Headers HTTP (ej: {"Range": "bytes=0-99"})
    headers: HashMap<String, String>,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Request vacío
    EmptyRequest,

    /// Request incompleto o truncado
    IncompleteRequest,

    /// Formato inválido de la request line
    InvalidRequestLine,

    /// Token de método desconocido
    UnknownMethod(String),

    /// Versión HTTP incorrecta (debe ser HTTP/1.0 o HTTP/1.1)
    InvalidHttpVersion(String),

    /// Header malformado (sin ':')
    InvalidHeader(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyRequest => write!(f, "Empty request"),
            ParseError::IncompleteRequest => write!(f, "Incomplete HTTP request"),
            ParseError::InvalidRequestLine => write!(f, "Invalid request line format"),
            ParseError::UnknownMethod(m) => write!(f, "Unknown HTTP method: {}", m),
            ParseError::InvalidHttpVersion(v) => write!(f, "Invalid HTTP version: {}", v),
            ParseError::InvalidHeader(h) => write!(f, "Invalid header: {}", h),
        }
    }
}

impl std::error::Error for ParseError {}

impl Request {
    /// Parsea un request HTTP desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use static_server::http::{Method, Request};
    ///
    /// let raw = b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.path(), "/index.html");
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        // Convertir a string (validando que sea UTF-8 válido)
        let request_str = std::str::from_utf8(buffer)
            .map_err(|_| ParseError::InvalidRequestLine)?;

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        // Separar por \r\n para obtener líneas
        let lines: Vec<&str> = request_str.split("\r\n").collect();

        if lines.is_empty() {
            return Err(ParseError::IncompleteRequest);
        }

        // 1. Parsear la request line (primera línea)
        let (method, path, version) = Self::parse_request_line(lines[0])?;

        // 2. Parsear headers (resto de líneas hasta encontrar línea vacía)
        let headers = Self::parse_headers(&lines[1..])?;

        Ok(Request {
            method,
            path,
            headers,
            version,
        })
    }

    /// Parsea la request line (primera línea del request)
    ///
    /// Formato: `GET /path HTTP/1.1`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        // Parsear método
        let method = Method::from_str(parts[0])?;

        // El servidor estático ignora la query string: el recurso es el path
        let path = match parts[1].find('?') {
            Some(pos) => parts[1][..pos].to_string(),
            None => parts[1].to_string(),
        };

        // Validar versión HTTP
        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, path, version))
    }

    /// Parsea los headers HTTP
    ///
    /// Cada header tiene formato: "Name: Value"
    fn parse_headers(lines: &[&str]) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            // La línea vacía marca el fin de los headers
            if line.trim().is_empty() {
                break;
            }

            // Buscar el separador ':'
            if let Some(colon_pos) = line.find(':') {
                let name = line[..colon_pos].trim().to_string();
                let value = line[colon_pos + 1..].trim().to_string();
                headers.insert(name, value);
            } else {
                // Header sin ':' es inválido
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el path del request (sin query string)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene el header `Range` parseado, si existe y es válido
    ///
    /// Un valor presente pero sintácticamente inválido se trata como
    /// ausente (el archivo se sirve completo con 200, como indica el
    /// RFC 7233 para rangos no interpretables).
    pub fn byte_range(&self) -> Option<ByteRange> {
        self.header("Range").and_then(ByteRange::parse)
    }
}

/// Rango de bytes pedido en un header `Range: bytes=...`
///
/// Tres formas válidas:
/// - `bytes=a-b`: desde el byte `a` hasta el `b` inclusive
/// - `bytes=a-`: desde el byte `a` hasta el final
/// - `bytes=-n`: los últimos `n` bytes (sufijo)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Primer byte pedido (None para la forma sufijo)
    pub start: Option<u64>,

    /// Último byte pedido, o longitud del sufijo si `start` es None
    pub end: Option<u64>,
}

impl ByteRange {
    /// Parsea el valor de un header `Range`
    ///
    /// Retorna None si el valor no tiene la forma `bytes=a-b` / `bytes=a-`
    /// / `bytes=-n`. Rangos múltiples (`bytes=0-1,5-6`) no se soportan.
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::ByteRange;
    ///
    /// let r = ByteRange::parse("bytes=2-4").unwrap();
    /// assert_eq!(r.start, Some(2));
    /// assert_eq!(r.end, Some(4));
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let spec = value.trim().strip_prefix("bytes=")?;

        // Rangos múltiples quedan fuera del alcance del servidor
        if spec.contains(',') {
            return None;
        }

        let dash = spec.find('-')?;
        let start_str = &spec[..dash];
        let end_str = &spec[dash + 1..];

        let start = if start_str.is_empty() {
            None
        } else {
            Some(start_str.parse::<u64>().ok()?)
        };

        let end = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };

        // "bytes=-" no especifica nada
        if start.is_none() && end.is_none() {
            return None;
        }

        Some(ByteRange { start, end })
    }

    /// Resuelve el rango contra el tamaño real del recurso
    ///
    /// Retorna `Ok((primer_byte, último_byte))` inclusive, o `Err(())` si el
    /// rango queda invertido o fuera de límites (el caller responde 416).
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::ByteRange;
    ///
    /// // Los últimos 1 bytes de un recurso de 10
    /// let r = ByteRange::parse("bytes=-1").unwrap();
    /// assert_eq!(r.resolve(10), Ok((9, 9)));
    ///
    /// // Rango invertido
    /// let r = ByteRange::parse("bytes=10-9").unwrap();
    /// assert!(r.resolve(10).is_err());
    /// ```
    pub fn resolve(&self, size: u64) -> Result<(u64, u64), ()> {
        let (start, end) = match (self.start, self.end) {
            // bytes=a-b
            (Some(s), Some(e)) => (s, e),
            // bytes=a-  -> hasta el final
            (Some(s), None) => {
                if size == 0 {
                    return Err(());
                }
                (s, size - 1)
            }
            // bytes=-n  -> sufijo de n bytes
            (None, Some(n)) => {
                if n == 0 || n > size {
                    return Err(());
                }
                (size - n, size - 1)
            }
            (None, None) => return Err(()),
        };

        if start > end || start >= size || end >= size {
            return Err(());
        }

        Ok((start, end))
    }
}
