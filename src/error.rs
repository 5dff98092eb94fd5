use thiserror::Error;

/// Kiosk-wide error types
#[derive(Error, Debug)]
pub enum KioskError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KioskError {
    pub fn invalid_response<S: Into<String>>(msg: S) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Short text suitable for the on-screen alert.
    pub fn alert_text(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "The server did not answer in time".to_string(),
            Self::Http(e) if e.is_connect() => "Cannot reach the server".to_string(),
            Self::Backend { status, .. } => format!("Server rejected the request ({})", status),
            other => other.to_string(),
        }
    }
}

/// Result type alias using KioskError
pub type KioskResult<T> = Result<T, KioskError>;
