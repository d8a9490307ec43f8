use crate::error::SourceError;
use async_trait::async_trait;
use library_sync_models::{LibraryRow, MediaType, RowPatch, SearchResult};

/// The authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `None` when there is no usable session
    async fn current_user(&self) -> Result<Option<AuthUser>, SourceError>;
}

/// The authoritative library table.
///
/// Every statement is scoped by the user's id, even where the backend also
/// enforces row-level security.
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    fn source_name(&self) -> &str;

    /// All rows owned by `user`, most recently added first
    async fn select_ordered(&self, user: &AuthUser) -> Result<Vec<LibraryRow>, SourceError>;

    /// Fails with `SourceError::Duplicate` when `(media_type, media_id)` already exists for the user
    async fn insert(&self, row: &LibraryRow) -> Result<(), SourceError>;

    /// Fails with `SourceError::NotFound` when no row matched
    async fn update(
        &self,
        user: &AuthUser,
        media_type: MediaType,
        media_id: u64,
        patch: &RowPatch,
    ) -> Result<(), SourceError>;

    /// Fails with `SourceError::NotFound` when no row matched
    async fn delete(&self, user: &AuthUser, media_type: MediaType, media_id: u64) -> Result<(), SourceError>;

    async fn delete_all(&self, user: &AuthUser) -> Result<(), SourceError>;
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Movies and series matching `query`, malformed entries dropped
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchResult>, SourceError>;
}
