//! # Cola de Admisión
//!
//! Buffer circular acotado de tokens de admisión entre el acceptor
//! (productor) y los workers (consumidores), con la disciplina clásica de
//! dos semáforos contadores más un mutex:
//!
//! - `empty_slots` (inicial Q): el acceptor lo decrementa **sin bloquear**
//!   antes de insertar; si no hay slot, la conexión se rechaza con 503.
//! - `filled_slots` (inicial 0): se incrementa después de insertar; los
//!   workers lo decrementan al consumir.
//! - El mutex interno protege `front`, `count` y el arreglo del ring.
//!
//! Invariantes (en reposo): `count + empty_slots = Q` y
//! `count = filled_slots`. El token es una señal de admisión, no la
//! conexión: la conexión viaja por el canal del worker elegido.

use std::sync::{Condvar, Mutex};

/// Semáforo contador construido sobre Mutex + Condvar
///
/// Equivalente en un solo proceso a los semáforos POSIX nombrados del
/// modelo multi-proceso: `wait` decrementa (bloqueando si el valor es 0),
/// `try_wait` decrementa solo si puede, `post` incrementa y despierta a un
/// thread en espera.
pub struct Semaphore {
    value: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// Crea un semáforo con el valor inicial dado
    pub fn new(initial: usize) -> Self {
        Self {
            value: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Decrementa, bloqueando mientras el valor sea 0
    pub fn wait(&self) {
        let mut value = self.value.lock().unwrap();
        while *value == 0 {
            value = self.cond.wait(value).unwrap();
        }
        *value -= 1;
    }

    /// Intenta decrementar sin bloquear; retorna false si el valor era 0
    pub fn try_wait(&self) -> bool {
        let mut value = self.value.lock().unwrap();
        if *value == 0 {
            return false;
        }
        *value -= 1;
        true
    }

    /// Incrementa y despierta a un thread en espera
    pub fn post(&self) {
        let mut value = self.value.lock().unwrap();
        *value += 1;
        self.cond.notify_one();
    }

    /// Valor actual (solo informativo: puede cambiar apenas retorna)
    pub fn value(&self) -> usize {
        *self.value.lock().unwrap()
    }
}

/// Token de admisión que viaja por el ring compartido
///
/// Es una señal, no un file descriptor: indica que una conexión fue
/// admitida y a qué worker se le envió por su canal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionToken {
    /// Worker elegido por round-robin para esta conexión
    pub worker_id: usize,

    /// Campo de relleno del registro (el layout del token es fijo)
    pub placeholder: u32,
}

impl AdmissionToken {
    /// Token para el worker dado
    pub fn for_worker(worker_id: usize) -> Self {
        Self {
            worker_id,
            placeholder: 0,
        }
    }
}

/// Buffer circular de tokens: inserción en `(front + count) % Q`,
/// extracción en `front`
struct TokenRing {
    items: Vec<AdmissionToken>,
    front: usize,
    count: usize,
}

/// Cola de admisión acotada con backpressure
pub struct AdmissionQueue {
    ring: Mutex<TokenRing>,
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    capacity: usize,
}

impl AdmissionQueue {
    /// Crea la cola con capacidad Q (≥ 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(TokenRing {
                items: vec![AdmissionToken::for_worker(0); capacity],
                front: 0,
                count: 0,
            }),
            empty_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            capacity,
        }
    }

    /// Intenta admitir una conexión sin bloquear
    ///
    /// Si la cola está saturada retorna false y el caller responde 503.
    /// En éxito inserta el token y publica un slot lleno.
    pub fn try_admit(&self, token: AdmissionToken) -> bool {
        // Decremento no bloqueante del contador de slots libres
        if !self.empty_slots.try_wait() {
            return false;
        }

        {
            let mut ring = self.ring.lock().unwrap();
            let pos = (ring.front + ring.count) % self.capacity;
            ring.items[pos] = token;
            ring.count += 1;
        }

        self.filled_slots.post();
        true
    }

    /// Consume un token (bloqueante)
    ///
    /// Decrementa `filled_slots`, saca el token del frente del ring y
    /// libera un slot vacío.
    pub fn take(&self) -> AdmissionToken {
        self.filled_slots.wait();

        let token = {
            let mut ring = self.ring.lock().unwrap();
            let token = ring.items[ring.front];
            ring.front = (ring.front + 1) % self.capacity;
            ring.count -= 1;
            token
        };

        self.empty_slots.post();
        token
    }

    /// Cantidad de tokens en la cola
    pub fn len(&self) -> usize {
        self.ring.lock().unwrap().count
    }

    /// Verdadero si no hay tokens pendientes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacidad Q de la cola
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Valor actual del semáforo de slots libres
    pub fn empty_slots(&self) -> usize {
        self.empty_slots.value()
    }

    /// Valor actual del semáforo de slots llenos
    pub fn filled_slots(&self) -> usize {
        self.filled_slots.value()
    }
}
