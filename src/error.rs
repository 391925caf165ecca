use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoachError>;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure returned by the text-generation and speech-synthesis services.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// No reachable server or another connectivity-class failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status (rate limit, server error, ...).
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Malformed call, rejected before anything was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Api {
            status,
            message: message.into(),
        }
    }

    /// Numeric HTTP-style status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure is a connectivity problem rather than a server answer.
    ///
    /// Status 0 and 503 count as network failures; every other status is a
    /// server/rate-limit condition. Without a status the message decides.
    pub fn is_network(&self) -> bool {
        match self {
            ServiceError::Network(_) => true,
            ServiceError::Api { status, .. } => matches!(status, 0 | 503),
            other => other.to_string().to_lowercase().contains("network"),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ServiceError::api(status.as_u16(), err.to_string()),
            None if err.is_decode() => ServiceError::Decode(err.to_string()),
            None => ServiceError::Network(err.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum AudioError {
    #[error("Audio decode failed: {0}")]
    Decode(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Playback stopped")]
    Stopped,
}
