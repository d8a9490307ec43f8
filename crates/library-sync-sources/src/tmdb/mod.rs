pub mod api;
pub mod client;

pub use api::{poster_url, validate_query, MAX_QUERY_LEN, MIN_QUERY_LEN, POSTER_BASE_URL};
pub use client::TmdbClient;
