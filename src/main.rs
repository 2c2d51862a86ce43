//! # Static Server - Entry Point
//!
//! Punto de entrada del servidor HTTP/1.1 de archivos estáticos.
//!
//! Recibe un único argumento posicional: la ruta del archivo de
//! configuración (default `server.conf`). Sale con código 0 tras un
//! apagado graceful y con 1 ante un error de arranque.

use clap::Parser;
use static_server::config::{Cli, Config};
use static_server::server::{signal, Server};

fn main() {
    println!("=================================");
    println!("  RedUnix Static HTTP/1.1 Server");
    println!("  Principios de Sistemas Operativos");
    println!("=================================\n");

    let cli = Cli::parse();

    // Cargar configuración desde el archivo
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[!] Error de configuración: {}", e);
            std::process::exit(1);
        }
    };

    // Validar configuración
    if let Err(e) = config.validate() {
        eprintln!("[!] Configuración inválida: {}", e);
        std::process::exit(1);
    }

    config.print_summary();

    // SIGINT/SIGTERM piden el apagado graceful
    if let Err(e) = signal::install() {
        eprintln!("[!] No se pudieron instalar los handlers de señales: {}", e);
        std::process::exit(1);
    }

    // Crear y correr el servidor (bloquea hasta el apagado)
    let mut server = Server::new(config);
    if let Err(e) = server.run() {
        eprintln!("[!] Error fatal: {}", e);
        std::process::exit(1);
    }
}
