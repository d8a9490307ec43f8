use crate::error::SourceError;
use library_sync_models::{MediaType, SearchResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

// TMDB API base URL
pub const API_BASE: &str = "https://api.themoviedb.org/3";
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p";

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_QUERY_LEN: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchMultiResponse {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

/// Raw `/search/multi` entry; people and malformed entries are filtered out
#[derive(Debug, Deserialize)]
struct TmdbSearchItem {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    overview: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TmdbSearchItem {
    fn into_search_result(self) -> Option<SearchResult> {
        let id = self.id.filter(|id| *id != 0)?;
        let media_type = match self.media_type.as_deref() {
            Some("movie") => MediaType::Movie,
            Some("tv") => MediaType::Tv,
            _ => return None,
        };
        let title = non_empty(self.title);
        let name = non_empty(self.name);
        if title.is_none() && name.is_none() {
            return None;
        }
        let poster_path = Some(non_empty(self.poster_path)?);

        Some(SearchResult {
            id,
            title,
            name,
            poster_path,
            vote_average: self.vote_average.unwrap_or_default(),
            release_date: non_empty(self.release_date),
            first_air_date: non_empty(self.first_air_date),
            media_type,
            overview: non_empty(self.overview),
        })
    }
}

/// Trim the query and enforce the 2..=50 character window
pub fn validate_query(query: &str) -> Result<&str, SourceError> {
    let trimmed = query.trim();
    let len = trimmed.chars().count();
    if len < MIN_QUERY_LEN {
        return Err(SourceError::QueryTooShort { min: MIN_QUERY_LEN });
    }
    if len > MAX_QUERY_LEN {
        return Err(SourceError::QueryTooLong { max: MAX_QUERY_LEN });
    }
    Ok(trimmed)
}

/// Full image URL for a poster path at the given TMDB size (e.g. `w185`)
pub fn poster_url(poster_path: &str, size: &str) -> String {
    format!("{}/{}{}", POSTER_BASE_URL, size, poster_path)
}

/// Parse a `/search/multi` body, dropping anything that is not a usable movie or series
pub fn parse_search_results(body: &str) -> Result<Vec<SearchResult>, SourceError> {
    let response: SearchMultiResponse = serde_json::from_str(body)?;
    let Some(results) = response.results else {
        warn!("TMDB API returned invalid response structure");
        return Ok(Vec::new());
    };

    let total = results.len();
    let valid: Vec<SearchResult> = results
        .into_iter()
        .filter_map(|value| serde_json::from_value::<TmdbSearchItem>(value).ok())
        .filter_map(TmdbSearchItem::into_search_result)
        .collect();

    debug!("TMDB search returned {} results ({} usable)", total, valid.len());
    Ok(valid)
}

pub async fn search_multi(
    client: &Client,
    base_url: &str,
    access_token: &str,
    language: &str,
    query: &str,
) -> Result<Vec<SearchResult>, SourceError> {
    let url = format!(
        "{}/search/multi?query={}&language={}&page=1",
        base_url,
        urlencoding::encode(query),
        urlencoding::encode(language)
    );

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", access_token))
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        return Err(SourceError::http(status, format!("TMDB search failed: {}", error_text)));
    }

    let body = response.text().await?;
    parse_search_results(&body)
}
