use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::adapters::http::state::HttpState;
use crate::domain::client::ClientHints;
use crate::domain::stream::{ClientEvent, ServerEvent};

const WELCOME: &str = "Successfully connected to detection relay";

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    client: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    State(st): State<HttpState>,
) -> Response {
    if !origin_allowed(&headers, st.config.allowed_origins().as_deref()) {
        warn!("WebSocket rechazado desde el origen {:?}", headers.get(header::ORIGIN));
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    let hints = ClientHints {
        user_agent: header_str(&headers, header::USER_AGENT.as_str()),
        declared: header_str(&headers, "x-client-kind").or(query.client),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, st, hints))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Las peticiones sin cabecera `Origin` (clientes nativos) siempre pasan.
pub fn origin_allowed(headers: &HeaderMap, allowed: Option<&[String]>) -> bool {
    let Some(allowed) = allowed else { return true };
    match headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
        None => true,
        Some(origin) => {
            let origin = origin.trim_end_matches('/');
            allowed.iter().any(|a| a == origin)
        }
    }
}

async fn handle_socket(socket: WebSocket, st: HttpState, hints: ClientHints) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let kind = st.registry.register(&connection_id, &hints, tx);
    info!(%connection_id, ?kind, "Cliente conectado");
    st.frames.emitter().emit_connected(&connection_id, WELCOME);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Error serializando evento: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&st, &connection_id, &text),
            Ok(Message::Binary(_)) => {
                st.frames.emitter().emit_error(&connection_id, "Binary messages are not supported; send JSON events");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%connection_id, "Error de socket: {}", e);
                break;
            }
        }
    }

    st.registry.unregister(&connection_id);
    writer.abort();
    info!(%connection_id, "Cliente desconectado");
}

/// Enruta un evento del cliente. Cada frame corre en su propia tarea para que el
/// bucle siga leyendo.
pub fn dispatch(st: &HttpState, connection_id: &str, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::Frame(payload)) => {
            if !st.frames.admit(connection_id) {
                warn!(connection_id, "Frame descartado: el anterior sigue en proceso");
                return;
            }
            let frames = st.frames.clone();
            let connection_id = connection_id.to_string();
            tokio::spawn(async move {
                frames.handle_frame(&connection_id, payload).await;
            });
        }
        Ok(ClientEvent::Ping(ping)) => {
            st.frames.emitter().emit_pong(connection_id, ping);
        }
        Err(e) => {
            st.frames.emitter().emit_error(connection_id, format!("Invalid message: {e}"));
        }
    }
}
