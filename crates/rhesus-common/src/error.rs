use thiserror::Error;

#[derive(Debug, Error)]
pub enum RhesusError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{service} error: {message}")]
    Upstream { service: String, message: String },

    #[error("Security policy violation: {0}")]
    Security(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RhesusError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream { service: service.into(), message: message.into() }
    }

    /// Whether the error was caused by the caller rather than a remote service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound(_))
    }
}

impl From<std::io::Error> for RhesusError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RhesusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display() {
        let err = RhesusError::upstream("EBI", "job submission failed");
        assert_eq!(err.to_string(), "EBI error: job submission failed");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RhesusError::InvalidInput("empty".into()).is_client_error());
        assert!(RhesusError::NotFound("gone".into()).is_client_error());
        assert!(!RhesusError::Storage("disk".into()).is_client_error());
    }
}
