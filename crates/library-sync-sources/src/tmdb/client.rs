use crate::error::SourceError;
use crate::retry::RetryPolicy;
use crate::supabase::client::create_client;
use crate::tmdb::api;
use crate::traits::MetadataProvider;
use async_trait::async_trait;
use library_sync_config::TmdbConfig;
use library_sync_models::SearchResult;
use reqwest::Client;
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    base_url: String,
    access_token: String,
    language: String,
    retry: RetryPolicy,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Self {
        Self {
            client: Arc::new(create_client()),
            base_url: api::API_BASE.to_string(),
            access_token: config.access_token.clone(),
            language: config.language.clone(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    #[instrument(skip(self))]
    async fn search_multi(&self, query: &str) -> Result<Vec<SearchResult>, SourceError> {
        let query = api::validate_query(query)?;
        self.retry
            .run("tmdb_search", || {
                api::search_multi(&self.client, &self.base_url, &self.access_token, &self.language, query)
            })
            .await
    }
}
