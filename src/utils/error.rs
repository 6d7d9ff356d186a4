use crate::core::mapping::MappingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatsonError {
    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{domain} returned {code}: {message}")]
    Service {
        domain: String,
        code: u16,
        message: String,
        recovery: Option<String>,
    },

    #[error("{domain} returned {code} with an unrecognised body")]
    Http { domain: String, code: u16, body: String },

    #[error("Authentication failed: {message}")]
    Authentication { code: Option<u16>, message: String },

    #[error("Response mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Streaming protocol error: {message}")]
    Protocol { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl From<tokio_tungstenite::tungstenite::Error> for WatsonError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WatsonError::WebSocket(Box::new(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Service,
    Authentication,
    Data,
    Configuration,
}

impl WatsonError {
    /// HTTP status (or service-reported code) associated with the failure, if any.
    pub fn code(&self) -> Option<u16> {
        match self {
            WatsonError::Service { code, .. } | WatsonError::Http { code, .. } => Some(*code),
            WatsonError::Authentication { code, .. } => *code,
            WatsonError::Transport(e) => e.status().map(|s| s.as_u16()),
            WatsonError::WebSocket(e) => match e.as_ref() {
                tokio_tungstenite::tungstenite::Error::Http(response) => {
                    Some(response.status().as_u16())
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WatsonError::Transport(_) | WatsonError::WebSocket(_) | WatsonError::IoError(_) => {
                ErrorCategory::Network
            }
            WatsonError::Service { .. } | WatsonError::Http { .. } | WatsonError::Protocol { .. } => {
                ErrorCategory::Service
            }
            WatsonError::Authentication { .. } => ErrorCategory::Authentication,
            WatsonError::Mapping(_) | WatsonError::Serialization(_) => ErrorCategory::Data,
            WatsonError::InvalidUrl(_)
            | WatsonError::ConfigValidationError { .. }
            | WatsonError::InvalidConfigValueError { .. }
            | WatsonError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether repeating the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WatsonError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => matches!(self.code(), Some(429) | Some(500..=599)),
        }
    }

    pub(crate) fn authentication(code: Option<u16>, message: impl Into<String>) -> Self {
        WatsonError::Authentication {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatsonError>;
