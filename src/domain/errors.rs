use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Error de operación: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Fallos al convertir los bytes de un frame en píxeles.
/// Los mensajes llegan tal cual al cliente en el evento `error`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("empty image payload")]
    EmptyPayload,
    #[error("malformed image: {0}")]
    MalformedImage(String),
    #[error("raw frames require both width and height")]
    MissingDimensions,
    #[error("shape mismatch: expected {expected} bytes, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Inference timed out after {0} ms")]
    Timeout(u64),
    #[error("Inference failed: {0}")]
    Failed(String),
    #[error("Inference worker is not running")]
    WorkerGone,
}

/// Todo lo que puede fallar entre recibir un frame y responderlo.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
