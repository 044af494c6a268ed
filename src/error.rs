use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadboardError {
    // Backend errors
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("unexpected response format: {0}")]
    Format(String),

    #[error("authentication expired (HTTP {status}), log in again")]
    AuthExpired { status: u16 },

    // Local errors
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl LeadboardError {
    /// Whether this error should clear the stored credential.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, LeadboardError::AuthExpired { .. })
    }
}

impl From<reqwest::Error> for LeadboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return LeadboardError::Format(err.to_string());
        }
        if let Some(status) = err.status() {
            return LeadboardError::HttpStatus {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        LeadboardError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LeadboardError>;
