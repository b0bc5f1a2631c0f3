use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::domain::client::{classify_headers, classify_payload, ClientHints, ClientKind};
use crate::domain::stream::ServerEvent;

pub type Outbox = UnboundedSender<ServerEvent>;

struct ConnectionEntry {
    kind: ClientKind,
    refined: bool,
    in_flight: bool,
    outbox: Outbox,
}

/// Conexiones vivas, indexadas por id de conexión.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<String, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &str, hints: &ClientHints, outbox: Outbox) -> ClientKind {
        let kind = classify_headers(hints);
        let entry = ConnectionEntry { kind, refined: false, in_flight: false, outbox };
        self.lock().insert(connection_id.to_string(), entry);
        kind
    }

    /// Recurre a la heurística de tamaño de payload una sola vez, y solo si las
    /// cabeceras no fueron concluyentes.
    pub fn classify_from_payload(&self, connection_id: &str, payload_size: usize) -> ClientKind {
        let mut map = self.lock();
        let Some(entry) = map.get_mut(connection_id) else {
            return ClientKind::Unknown;
        };
        if entry.kind == ClientKind::Unknown && !entry.refined {
            entry.kind = classify_payload(payload_size);
            debug!(connection_id, kind = ?entry.kind, payload_size, "tipo de cliente refinado por payload");
        }
        entry.refined = true;
        entry.kind
    }

    pub fn unregister(&self, connection_id: &str) {
        self.lock().remove(connection_id);
    }

    /// Reserva el único hueco en vuelo. False si ya hay un frame en proceso o la
    /// conexión ya no existe.
    pub fn try_begin_frame(&self, connection_id: &str) -> bool {
        match self.lock().get_mut(connection_id) {
            Some(entry) if !entry.in_flight => {
                entry.in_flight = true;
                true
            }
            _ => false,
        }
    }

    pub fn end_frame(&self, connection_id: &str) {
        if let Some(entry) = self.lock().get_mut(connection_id) {
            entry.in_flight = false;
        }
    }

    pub fn kind(&self, connection_id: &str) -> Option<ClientKind> {
        self.lock().get(connection_id).map(|e| e.kind)
    }

    pub fn sender(&self, connection_id: &str) -> Option<Outbox> {
        self.lock().get(connection_id).map(|e| e.outbox.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ConnectionEntry>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn outbox() -> Outbox {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn register_and_refine_once() {
        let reg = ConnectionRegistry::new();
        assert_eq!(reg.register("c1", &ClientHints::default(), outbox()), ClientKind::Unknown);
        assert_eq!(reg.classify_from_payload("c1", 400_000), ClientKind::Flutter);
        // Ya refinado; un frame pequeño no lo cambia.
        assert_eq!(reg.classify_from_payload("c1", 10), ClientKind::Flutter);
        assert_eq!(reg.kind("c1"), Some(ClientKind::Flutter));
    }

    #[test]
    fn header_kind_is_not_overridden() {
        let reg = ConnectionRegistry::new();
        let hints = ClientHints { user_agent: Some("python-requests".into()), declared: None };
        assert_eq!(reg.register("c1", &hints, outbox()), ClientKind::Python);
        assert_eq!(reg.classify_from_payload("c1", 1_000_000), ClientKind::Python);
    }

    #[test]
    fn in_flight_slot_is_exclusive() {
        let reg = ConnectionRegistry::new();
        reg.register("c1", &ClientHints::default(), outbox());
        assert!(reg.try_begin_frame("c1"));
        assert!(!reg.try_begin_frame("c1"));
        reg.end_frame("c1");
        assert!(reg.try_begin_frame("c1"));
        assert!(!reg.try_begin_frame("ghost"));
    }

    #[test]
    fn unregister_forgets_connection() {
        let reg = ConnectionRegistry::new();
        reg.register("c1", &ClientHints::default(), outbox());
        assert_eq!(reg.len(), 1);
        reg.unregister("c1");
        assert!(reg.is_empty());
        assert!(reg.sender("c1").is_none());
        assert_eq!(reg.classify_from_payload("c1", 10), ClientKind::Unknown);
    }
}
