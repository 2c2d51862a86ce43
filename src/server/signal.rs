//! # Señales de Apagado
//!
//! SIGINT y SIGTERM piden el apagado graceful: el handler solo prende un
//! flag atómico (lo único async-signal-safe que necesitamos) y el loop de
//! accept lo observa. El handler se instala **sin** `SA_RESTART` a
//! propósito: así `accept(2)` retorna `EINTR` en vez de reanudarse y el
//! master puede salir del bloqueo para mirar el flag.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Instala el handler para SIGINT y SIGTERM
pub fn install() -> std::io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_signal as libc::sighandler_t;
        // sa_flags queda en 0: sin SA_RESTART, los syscalls bloqueantes
        // retornan EINTR y el loop puede observar el flag
        libc::sigemptyset(&mut action.sa_mask);

        for signum in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }
    }

    Ok(())
}

/// Verdadero si ya se recibió una señal de apagado
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
