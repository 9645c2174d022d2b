use stepnote_core::StepnoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The proxy answered with a non-2xx status.
    #[error("proxy error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("content host returned {status} for {url}")]
    Content { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] StepnoteError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
