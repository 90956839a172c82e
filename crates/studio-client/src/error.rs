use thiserror::Error;

/// Errors raised by the API client and the client-side flows built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("malformed event stream: {0}")]
    EventStream(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("too many attachments: {count} (max {max})")]
    TooManyAttachments { count: usize, max: usize },
    #[error("a response is still streaming")]
    ConversationBusy,
    #[error("cancelled")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for errors the server reported with a 404 status.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
