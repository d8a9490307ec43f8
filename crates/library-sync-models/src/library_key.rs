use crate::media::MediaType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical identity of a library entry, derived from `(media_type, media_id)`.
///
/// Rendered as `"{media_type}-{media_id}"` (e.g. `movie-603`). The string form
/// is the cache key; it is only parsed back into its parts at the remote
/// filter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryKey(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid library item id '{0}' (expected <movie|tv>-<number>)")]
pub struct ParseKeyError(pub String);

/// Derive the library id for a piece of media.
pub fn derive_id(media_type: MediaType, media_id: u64) -> LibraryKey {
    LibraryKey(format!("{}-{}", media_type, media_id))
}

impl LibraryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the key back into `(media_type, media_id)` for remote filters.
    pub fn parse(id: &str) -> Result<(MediaType, u64), ParseKeyError> {
        let (media_type, media_id) = id
            .split_once('-')
            .ok_or_else(|| ParseKeyError(id.to_string()))?;
        let media_type = media_type
            .parse::<MediaType>()
            .map_err(|_| ParseKeyError(id.to_string()))?;
        let media_id = media_id
            .parse::<u64>()
            .map_err(|_| ParseKeyError(id.to_string()))?;
        Ok((media_type, media_id))
    }

    /// Validate an untyped id (e.g. from user input) and normalise it.
    pub fn from_input(id: &str) -> Result<Self, ParseKeyError> {
        let (media_type, media_id) = Self::parse(id.trim())?;
        Ok(derive_id(media_type, media_id))
    }

    pub fn parts(&self) -> Result<(MediaType, u64), ParseKeyError> {
        Self::parse(&self.0)
    }
}

impl fmt::Display for LibraryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for LibraryKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LibraryKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
