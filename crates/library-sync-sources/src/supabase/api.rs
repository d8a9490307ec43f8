use crate::error::{SourceError, UNIQUE_VIOLATION};
use library_sync_models::{LibraryRow, MediaType, RowPatch};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::debug;

/// Error body returned by PostgREST
#[derive(Debug, Deserialize, Default)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Connection details for the REST endpoint of one table
pub struct TableEndpoint<'a> {
    pub client: &'a Client,
    pub base_url: &'a str,
    pub anon_key: &'a str,
    pub access_token: &'a str,
    pub table: &'a str,
}

impl<'a> TableEndpoint<'a> {
    fn url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", self.anon_key)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Accept", "application/json")
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn row_filters(user_id: &str, media_type: MediaType, media_id: u64) -> Vec<(&'static str, String)> {
    vec![
        ("user_id", eq(user_id)),
        ("media_id", eq(media_id)),
        ("media_type", eq(media_type)),
    ]
}

/// Turn a non-success response into a `SourceError`, recognising unique violations
async fn error_from_response(response: Response, context: &str) -> SourceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed: PostgrestError = serde_json::from_str(&body).unwrap_or_default();

    if parsed.code.as_deref() == Some(UNIQUE_VIOLATION) {
        return SourceError::Duplicate(parsed.details.or(parsed.message).unwrap_or(body));
    }
    if status == 401 {
        return SourceError::Unauthenticated;
    }

    let message = parsed.message.unwrap_or(body);
    SourceError::http(status, format!("{}: {}", context, message))
}

/// Rows touched by a `return=representation` write; empty means nothing matched
async fn affected_rows(response: Response, context: &str) -> Result<usize, SourceError> {
    if !response.status().is_success() {
        return Err(error_from_response(response, context).await);
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(0);
    }
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;
    Ok(rows.len())
}

pub async fn select_ordered(endpoint: &TableEndpoint<'_>, user_id: &str) -> Result<Vec<LibraryRow>, SourceError> {
    let response = endpoint
        .authorized(endpoint.client.get(endpoint.url()))
        .query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "added_at.desc".to_string()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Failed to fetch library").await);
    }

    let rows: Vec<LibraryRow> = response.json().await?;
    debug!("Fetched {} library rows", rows.len());
    Ok(rows)
}

pub async fn insert(endpoint: &TableEndpoint<'_>, row: &LibraryRow) -> Result<(), SourceError> {
    let response = endpoint
        .authorized(endpoint.client.post(endpoint.url()))
        .header("Prefer", "return=minimal")
        .json(row)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Failed to insert library item").await);
    }
    Ok(())
}

pub async fn update(
    endpoint: &TableEndpoint<'_>,
    user_id: &str,
    media_type: MediaType,
    media_id: u64,
    patch: &RowPatch,
) -> Result<(), SourceError> {
    let response = endpoint
        .authorized(endpoint.client.patch(endpoint.url()))
        .header("Prefer", "return=representation")
        .query(&row_filters(user_id, media_type, media_id))
        .json(patch)
        .send()
        .await?;

    match affected_rows(response, "Failed to update library item").await? {
        0 => Err(SourceError::NotFound),
        _ => Ok(()),
    }
}

pub async fn delete(
    endpoint: &TableEndpoint<'_>,
    user_id: &str,
    media_type: MediaType,
    media_id: u64,
) -> Result<(), SourceError> {
    let response = endpoint
        .authorized(endpoint.client.delete(endpoint.url()))
        .header("Prefer", "return=representation")
        .query(&row_filters(user_id, media_type, media_id))
        .send()
        .await?;

    match affected_rows(response, "Failed to delete library item").await? {
        0 => Err(SourceError::NotFound),
        _ => Ok(()),
    }
}

pub async fn delete_all(endpoint: &TableEndpoint<'_>, user_id: &str) -> Result<(), SourceError> {
    let response = endpoint
        .authorized(endpoint.client.delete(endpoint.url()))
        .header("Prefer", "return=minimal")
        .query(&[("user_id", eq(user_id))])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(error_from_response(response, "Failed to clear library").await);
    }
    Ok(())
}
