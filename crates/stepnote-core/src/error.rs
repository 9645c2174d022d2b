use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepnoteError {
    #[error("server configuration error: {0} is not set")]
    MissingCredential(&'static str),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid request parameters: {0}")]
    InvalidParameter(String),

    #[error("upstream service returned {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid annotation key '{0}': expected <task>_<section>_<field>")]
    InvalidAnnotationKey(String),

    #[error("unknown annotation field: {0}")]
    UnknownField(String),

    #[error("invalid value for {field}: {value}")]
    InvalidFieldValue { field: String, value: String },

    #[error("unsupported content host: {0} (only GitHub URLs are supported)")]
    UnsupportedContentHost(String),

    #[error("invalid content URL: {0}")]
    InvalidContentUrl(String),

    #[error("unknown color: {0}")]
    UnknownColor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StepnoteError>;
