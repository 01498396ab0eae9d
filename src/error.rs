use thiserror::Error;

/// Failure talking to the event service.
///
/// Cloneable so controllers can keep the last failure around for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, refused, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// 2xx response whose body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Http { status: 404 })
    }
}

/// Contract violations in the draft workflow. The UI is expected to prevent
/// these structurally, so they propagate to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("no draft has been generated for the selected event")]
    NoDraft,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}
