use std::sync::Arc;

use tracing::debug;

use crate::application::registry::ConnectionRegistry;
use crate::domain::stream::{DetectionsResponse, PingPayload, ServerEvent};

/// Envía eventos del servidor al canal de salida de una conexión. Si la conexión
/// desapareció a mitad de ciclo no es un error: el evento se descarta.
#[derive(Clone)]
pub struct ResponseEmitter {
    registry: Arc<ConnectionRegistry>,
}

impl ResponseEmitter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn emit_connected(&self, connection_id: &str, message: &str) -> bool {
        self.emit(
            connection_id,
            ServerEvent::ConnectionResponse { status: "connected".into(), message: message.into() },
        )
    }

    pub fn emit_detections(&self, connection_id: &str, response: DetectionsResponse) -> bool {
        self.emit(connection_id, ServerEvent::Detections(response))
    }

    pub fn emit_error(&self, connection_id: &str, message: impl Into<String>) -> bool {
        self.emit(connection_id, ServerEvent::Error { message: message.into() })
    }

    pub fn emit_pong(&self, connection_id: &str, ping: PingPayload) -> bool {
        self.emit(connection_id, ServerEvent::Pong(ping))
    }

    /// True si el evento quedó encolado para el escritor del socket.
    pub fn emit(&self, connection_id: &str, event: ServerEvent) -> bool {
        let Some(outbox) = self.registry.sender(connection_id) else {
            debug!(connection_id, "conexión cerrada, evento descartado");
            return false;
        };
        if outbox.send(event).is_err() {
            debug!(connection_id, "escritor del socket cerrado, evento descartado");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::ClientHints;
    use tokio::sync::mpsc;

    #[test]
    fn delivers_to_registered_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("c1", &ClientHints::default(), tx);

        let emitter = ResponseEmitter::new(registry);
        assert!(emitter.emit_error("c1", "boom"));
        match rx.try_recv().unwrap() {
            ServerEvent::Error { message } => assert_eq!(message, "boom"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn vanished_connection_is_a_noop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let emitter = ResponseEmitter::new(registry.clone());
        assert!(!emitter.emit_error("nobody", "boom"));

        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("c1", &ClientHints::default(), tx);
        drop(rx);
        assert!(!emitter.emit_pong("c1", PingPayload { timestamp: serde_json::Value::Null }));
    }
}
