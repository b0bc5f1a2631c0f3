use serde::{Deserialize, Serialize};

/// Decoded payloads at or above this size come from mobile clients pushing raw camera
/// planes or full-quality JPEGs; the desktop test clients send quality-50 JPEGs.
pub const FLUTTER_PAYLOAD_THRESHOLD: usize = 150_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClientKind {
    Python,
    Flutter,
    #[default]
    Unknown,
}

/// Connection-time hints. `declared` comes from an explicit `x-client-kind` header
/// or `client` query parameter.
#[derive(Debug, Clone, Default)]
pub struct ClientHints {
    pub user_agent: Option<String>,
    pub declared: Option<String>,
}

pub fn classify_headers(hints: &ClientHints) -> ClientKind {
    if let Some(kind) = hints.declared.as_deref().and_then(parse_kind) {
        return kind;
    }
    let Some(ua) = hints.user_agent.as_deref() else {
        return ClientKind::Unknown;
    };
    let ua = ua.to_ascii_lowercase();
    if ua.contains("python") {
        ClientKind::Python
    } else if ua.contains("dart") || ua.contains("flutter") {
        ClientKind::Flutter
    } else {
        ClientKind::Unknown
    }
}

pub fn classify_payload(payload_size: usize) -> ClientKind {
    if payload_size >= FLUTTER_PAYLOAD_THRESHOLD {
        ClientKind::Flutter
    } else {
        ClientKind::Python
    }
}

fn parse_kind(s: &str) -> Option<ClientKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "python" => Some(ClientKind::Python),
        "flutter" | "dart" => Some(ClientKind::Flutter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ua(s: &str) -> ClientHints {
        ClientHints { user_agent: Some(s.into()), declared: None }
    }

    #[test]
    fn user_agent_sniffing() {
        assert_eq!(classify_headers(&ua("python-socketio/5.11")), ClientKind::Python);
        assert_eq!(classify_headers(&ua("Dart/3.3 (dart:io)")), ClientKind::Flutter);
        assert_eq!(classify_headers(&ua("Mozilla/5.0")), ClientKind::Unknown);
        assert_eq!(classify_headers(&ClientHints::default()), ClientKind::Unknown);
    }

    #[test]
    fn declared_kind_wins() {
        let hints = ClientHints { user_agent: Some("python".into()), declared: Some("Flutter".into()) };
        assert_eq!(classify_headers(&hints), ClientKind::Flutter);

        let hints = ClientHints { user_agent: Some("python".into()), declared: Some("???".into()) };
        assert_eq!(classify_headers(&hints), ClientKind::Python);
    }

    #[test]
    fn payload_threshold() {
        assert_eq!(classify_payload(30_000), ClientKind::Python);
        assert_eq!(classify_payload(FLUTTER_PAYLOAD_THRESHOLD), ClientKind::Flutter);
    }
}
