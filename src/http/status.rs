//! # Códigos de Estado HTTP
//!
//! Este módulo define los códigos de estado HTTP/1.1 que emite el servidor
//! de archivos estáticos. Según el RFC 7231:
//!
//! - **2xx**: Éxito (200 OK, 206 Partial Content)
//! - **4xx**: Error del cliente (400, 403, 404, 405, 416)
//! - **5xx**: Error del servidor (500, 503)

/// Representa los códigos de estado HTTP que soporta nuestro servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 206 Partial Content - Respuesta a un request con header Range válido
    PartialContent = 206,

    /// 400 Bad Request - Request malformado o truncado
    BadRequest = 400,

    /// 403 Forbidden - Path traversal o permiso de lectura denegado
    Forbidden = 403,

    /// 404 Not Found - El archivo solicitado no existe
    NotFound = 404,

    /// 405 Method Not Allowed - Método distinto de GET/HEAD
    MethodNotAllowed = 405,

    /// 416 Range Not Satisfiable - Rango invertido o fuera de límites
    RangeNotSatisfiable = 416,

    /// 500 Internal Server Error - Error interno del servidor
    InternalServerError = 500,

    /// 503 Service Unavailable - Cola de admisión o pool saturados
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// Estos textos están definidos en el RFC 7231 y son estándares.
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::PartialContent => "Partial Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RangeNotSatisfiable => "Range Not Satisfiable",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    ///
    /// # Ejemplo
    /// ```
    /// use static_server::http::StatusCode;
    /// assert!(StatusCode::Ok.is_success());
    /// assert!(StatusCode::PartialContent.is_success());
    /// assert!(!StatusCode::NotFound.is_success());
    /// ```
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::PartialContent)
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        let code = self.as_u16();
        (400..500).contains(&code)
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        let code = self.as_u16();
        (500..600).contains(&code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formatea el código de estado para mostrarlo
    ///
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
