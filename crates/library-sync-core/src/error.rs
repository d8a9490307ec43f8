use library_sync_models::ParseKeyError;
use library_sync_sources::SourceError;
use thiserror::Error;

/// Failures surfaced by `LibrarySyncStore` operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("You need to be signed in to do that")]
    Unauthenticated,

    #[error("This item is already in your library")]
    DuplicateItem,

    /// The remote row was already gone; move and remove treat this as satisfied
    #[error("Item not found in your library")]
    NotFound,

    #[error("{0}")]
    RemoteFailure(String),

    #[error("Library is unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    InvalidItemId(#[from] ParseKeyError),
}

impl StoreError {
    /// Errors that leave the desired end state in place and need no rollback
    pub fn is_benign(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// Translate a remote failure on a write path
    pub fn from_write(error: SourceError) -> Self {
        match error {
            SourceError::Unauthenticated => StoreError::Unauthenticated,
            SourceError::Duplicate(_) => StoreError::DuplicateItem,
            SourceError::NotFound => StoreError::NotFound,
            other => StoreError::RemoteFailure(format!("Database error: {}", other)),
        }
    }

    /// Translate a remote failure on the read path
    pub fn from_read(error: SourceError) -> Self {
        match error {
            SourceError::Unauthenticated => StoreError::Unauthenticated,
            other => StoreError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_translation() {
        assert_eq!(
            StoreError::from_write(SourceError::Duplicate("key exists".to_string())),
            StoreError::DuplicateItem
        );
        assert_eq!(StoreError::from_write(SourceError::NotFound), StoreError::NotFound);
        assert!(matches!(
            StoreError::from_write(SourceError::http(500, "boom")),
            StoreError::RemoteFailure(_)
        ));
        assert_eq!(
            StoreError::DuplicateItem.to_string(),
            "This item is already in your library"
        );
    }

    #[test]
    fn test_read_translation() {
        assert!(matches!(
            StoreError::from_read(SourceError::http(503, "down")),
            StoreError::StoreUnavailable(_)
        ));
        assert_eq!(StoreError::from_read(SourceError::Unauthenticated), StoreError::Unauthenticated);
    }
}
