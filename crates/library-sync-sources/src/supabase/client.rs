use crate::error::SourceError;
use crate::supabase::api::{self, TableEndpoint};
use crate::supabase::auth::{self, SignUpOutcome};
use crate::traits::{AuthUser, IdentityProvider, RemoteLibrary};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use library_sync_config::{CredentialStore, StoredSession, SupabaseConfig};
use library_sync_models::{LibraryRow, MediaType, RowPatch};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Refresh the access token when it expires within this window
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supabase project client: GoTrue for identity, PostgREST for the library table
#[derive(Clone)]
pub struct SupabaseClient {
    client: Arc<Client>,
    base_url: String,
    anon_key: String,
    table: String,
    session: Arc<RwLock<Option<StoredSession>>>,
    credentials_file: Option<PathBuf>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client: Arc::new(create_client()),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            table: config.table.clone(),
            session: Arc::new(RwLock::new(None)),
            credentials_file: None,
        }
    }

    /// Persist sessions to (and restore them from) a credentials file
    pub fn with_credentials_file(mut self, path: PathBuf) -> anyhow::Result<Self> {
        let mut store = CredentialStore::new(path.clone());
        store.load()?;
        self.session = Arc::new(RwLock::new(store.get_session()));
        self.credentials_file = Some(path);
        Ok(self)
    }

    pub async fn session(&self) -> Option<StoredSession> {
        self.session.read().await.clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, SourceError> {
        let session = auth::sign_in_with_password(&self.client, &self.base_url, &self.anon_key, email, password).await?;
        let user = AuthUser {
            id: session.user_id.clone(),
            email: session.email.clone(),
        };
        self.store_session(Some(session)).await;
        info!("Signed in as {}", email);
        Ok(user)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SourceError> {
        let outcome = auth::sign_up(&self.client, &self.base_url, &self.anon_key, email, password).await?;
        if let SignUpOutcome::SignedIn(ref session) = outcome {
            self.store_session(Some(session.clone())).await;
        }
        Ok(outcome)
    }

    pub async fn sign_out(&self) -> Result<(), SourceError> {
        let current = self.session.read().await.clone();
        if let Some(session) = current {
            if let Err(e) = auth::sign_out(&self.client, &self.base_url, &self.anon_key, &session.access_token).await {
                warn!("Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }
        self.store_session(None).await;
        info!("Signed out");
        Ok(())
    }

    async fn store_session(&self, session: Option<StoredSession>) {
        *self.session.write().await = session.clone();

        let Some(ref path) = self.credentials_file else {
            return;
        };
        let mut store = CredentialStore::new(path.clone());
        if let Err(e) = store.load() {
            warn!("Failed to load credentials file: {}", e);
        }
        match session {
            Some(ref session) => store.set_session(session),
            None => store.clear_session(),
        }
        if let Err(e) = store.save() {
            warn!("Failed to save session: {}", e);
        }
    }

    /// A usable access token, refreshing the session first when it is about to expire
    async fn access_token(&self) -> Result<Option<String>, SourceError> {
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };

        if session.expires_at > Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS) {
            return Ok(Some(session.access_token));
        }
        if session.refresh_token.is_empty() {
            debug!("Session expired and no refresh token is stored");
            self.store_session(None).await;
            return Ok(None);
        }

        match auth::refresh_session(&self.client, &self.base_url, &self.anon_key, &session.refresh_token).await {
            Ok(refreshed) => {
                let token = refreshed.access_token.clone();
                self.store_session(Some(refreshed)).await;
                debug!("Refreshed auth session");
                Ok(Some(token))
            }
            Err(SourceError::Auth(message)) => {
                warn!("Session refresh rejected: {}", message);
                self.store_session(None).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn require_token(&self) -> Result<String, SourceError> {
        self.access_token().await?.ok_or(SourceError::Unauthenticated)
    }

    fn endpoint<'a>(&'a self, access_token: &'a str) -> TableEndpoint<'a> {
        TableEndpoint {
            client: &self.client,
            base_url: &self.base_url,
            anon_key: &self.anon_key,
            access_token,
            table: &self.table,
        }
    }
}

pub fn create_client() -> Client {
    Client::builder()
        .user_agent(concat!("cinemora/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn current_user(&self) -> Result<Option<AuthUser>, SourceError> {
        let Some(token) = self.access_token().await? else {
            return Ok(None);
        };
        auth::get_user(&self.client, &self.base_url, &self.anon_key, &token).await
    }
}

#[async_trait]
impl RemoteLibrary for SupabaseClient {
    fn source_name(&self) -> &str {
        "supabase"
    }

    async fn select_ordered(&self, user: &AuthUser) -> Result<Vec<LibraryRow>, SourceError> {
        let token = self.require_token().await?;
        api::select_ordered(&self.endpoint(&token), &user.id).await
    }

    async fn insert(&self, row: &LibraryRow) -> Result<(), SourceError> {
        let token = self.require_token().await?;
        api::insert(&self.endpoint(&token), row).await
    }

    async fn update(
        &self,
        user: &AuthUser,
        media_type: MediaType,
        media_id: u64,
        patch: &RowPatch,
    ) -> Result<(), SourceError> {
        let token = self.require_token().await?;
        api::update(&self.endpoint(&token), &user.id, media_type, media_id, patch).await
    }

    async fn delete(&self, user: &AuthUser, media_type: MediaType, media_id: u64) -> Result<(), SourceError> {
        let token = self.require_token().await?;
        api::delete(&self.endpoint(&token), &user.id, media_type, media_id).await
    }

    async fn delete_all(&self, user: &AuthUser) -> Result<(), SourceError> {
        let token = self.require_token().await?;
        api::delete_all(&self.endpoint(&token), &user.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            url: "https://abc.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            table: "user_library".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_restored_from_credentials_file() {
        let file = NamedTempFile::new().unwrap();
        let mut store = CredentialStore::new(file.path().to_path_buf());
        store.set_session(&StoredSession {
            access_token: "jwt".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user_id: "user-1".to_string(),
            email: None,
        });
        store.save().unwrap();

        let client = SupabaseClient::new(&config())
            .with_credentials_file(file.path().to_path_buf())
            .unwrap();
        assert_eq!(client.base_url, "https://abc.supabase.co");
        assert_eq!(client.access_token().await.unwrap().as_deref(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_is_dropped() {
        let file = NamedTempFile::new().unwrap();
        let mut store = CredentialStore::new(file.path().to_path_buf());
        store.set_session(&StoredSession {
            access_token: "jwt".to_string(),
            refresh_token: String::new(),
            expires_at: Utc::now() - Duration::hours(1),
            user_id: "user-1".to_string(),
            email: None,
        });
        store.save().unwrap();

        let client = SupabaseClient::new(&config())
            .with_credentials_file(file.path().to_path_buf())
            .unwrap();
        assert_eq!(client.access_token().await.unwrap(), None);
        assert!(matches!(client.require_token().await, Err(SourceError::Unauthenticated)));

        let mut reloaded = CredentialStore::new(file.path().to_path_buf());
        reloaded.load().unwrap();
        assert!(reloaded.get_session().is_none());
    }
}
