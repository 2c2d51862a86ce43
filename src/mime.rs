//! # Tabla MIME
//!
//! Mapea extensiones de archivo a su `Content-Type` usando `mime_guess`.
//! El resto del servidor consume este módulo a través de una única función
//! para no acoplar los handlers a la librería.

use std::path::Path;

/// Obtiene el Content-Type para un path de archivo
///
/// Archivos sin extensión conocida se sirven como
/// `application/octet-stream`.
///
/// # Ejemplo
/// ```
/// use static_server::mime::content_type_for;
///
/// assert_eq!(content_type_for("index.html"), "text/html");
/// assert_eq!(content_type_for("img/logo.png"), "image/png");
/// ```
pub fn content_type_for<P: AsRef<Path>>(path: P) -> String {
    mime_guess::from_path(path.as_ref())
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
