use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Registro de identidades reportadas recientemente y cuándo se vieron por última vez.
///
/// Solo el reductor inserta y solo el barrido elimina. Las identidades no se emparejan
/// entre frames: es un registro de crear y caducar, no un tracker.
#[derive(Debug, Default)]
pub struct IdentityTable {
    entries: Mutex<HashMap<String, Instant>>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str, now: Instant) {
        self.lock().insert(id.to_string(), now);
    }

    /// Actualiza `last_seen` de una identidad conocida. Devuelve false si ya caducó.
    pub fn refresh(&self, id: &str, now: Instant) -> bool {
        match self.lock().get_mut(id) {
            Some(seen) => {
                *seen = now;
                true
            }
            None => false,
        }
    }

    /// Elimina las entradas con `now - last_seen > max_age`; devuelve cuántas.
    pub fn sweep(&self, now: Instant, max_age: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, seen| now.saturating_duration_since(*seen) <= max_age);
        before - entries.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        // Solo se envenena si una tarea de frame entra en pánico; el mapa sigue siendo válido.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Barrido en segundo plano cada `interval` mientras viva el runtime.
pub fn spawn_sweeper(table: Arc<IdentityTable>, interval: Duration, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = table.sweep(Instant::now(), max_age);
            if removed > 0 {
                debug!(removed, remaining = table.len(), "identidades caducadas eliminadas");
            }
        }
    })
}
