use thiserror::Error;

/// Postgres unique-violation code, surfaced by PostgREST on duplicate inserts
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Duplicate row: {0}")]
    Duplicate(String),

    #[error("No matching row")]
    NotFound,

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Search query must be at least {min} characters")]
    QueryTooShort { min: usize },

    #[error("Search query must be at most {max} characters")]
    QueryTooLong { max: usize },

    #[error("{0}")]
    Auth(String),
}

impl SourceError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        SourceError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Http { status, .. } => Some(*status),
            SourceError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Client errors are never retried; network and server errors are
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Network(_) => !matches!(self.status(), Some(400..=499)),
            SourceError::Http { status, .. } => !(400..500).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SourceError::http(503, "unavailable").is_retryable());
        assert!(!SourceError::http(404, "missing").is_retryable());
        assert!(!SourceError::http(429, "slow down").is_retryable());
        assert!(!SourceError::NotFound.is_retryable());
        assert!(!SourceError::QueryTooShort { min: 2 }.is_retryable());
    }
}
