use crate::library_key::{derive_id, LibraryKey};
use crate::media::MediaType;
use crate::search_result::SearchResult;
use crate::status::WatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's record of one piece of media being tracked.
///
/// `id` is always `derive_id(media_type, media_id)`. Exactly one of
/// `title`/`name` and one of `release_date`/`first_air_date` is populated,
/// chosen by `media_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryItem {
    pub id: LibraryKey,
    pub media_id: u64,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    pub status: WatchStatus,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Field-level update accepted by the remote library table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LibraryItem {
    /// Map a search candidate onto the library schema.
    ///
    /// `personal_rating` and `notes` start unset.
    pub fn from_search_result(candidate: &SearchResult, status: WatchStatus, added_at: DateTime<Utc>) -> Self {
        let (title, name, release_date, first_air_date) = match candidate.media_type {
            MediaType::Movie => (
                candidate.title.clone().or_else(|| candidate.name.clone()),
                None,
                candidate.release_date.clone(),
                None,
            ),
            MediaType::Tv => (
                None,
                candidate.name.clone().or_else(|| candidate.title.clone()),
                None,
                candidate.first_air_date.clone(),
            ),
        };

        Self {
            id: derive_id(candidate.media_type, candidate.id),
            media_id: candidate.id,
            media_type: candidate.media_type,
            title,
            name,
            poster_path: candidate.poster_path.clone(),
            vote_average: candidate.vote_average,
            release_date,
            first_air_date,
            status,
            added_at,
            personal_rating: None,
            notes: None,
        }
    }

    pub fn display_title(&self) -> &str {
        match self.media_type {
            MediaType::Movie => self.title.as_deref(),
            MediaType::Tv => self.name.as_deref(),
        }
        .unwrap_or("Untitled")
    }

    pub fn display_date(&self) -> Option<&str> {
        match self.media_type {
            MediaType::Movie => self.release_date.as_deref(),
            MediaType::Tv => self.first_air_date.as_deref(),
        }
    }
}

impl ItemUpdate {
    pub fn status(status: WatchStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.personal_rating.is_none() && self.notes.is_none()
    }

    /// Apply the set fields in place, leaving the rest untouched
    pub fn apply_to(&self, item: &mut LibraryItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(rating) = self.personal_rating {
            item.personal_rating = Some(rating);
        }
        if let Some(ref notes) = self.notes {
            item.notes = Some(notes.clone());
        }
    }
}
