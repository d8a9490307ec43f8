use crate::library_item::{ItemUpdate, LibraryItem};
use crate::library_key::derive_id;
use crate::media::MediaType;
use crate::status::WatchStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row shape of the remote `user_library` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryRow {
    pub user_id: String,
    pub media_id: u64,
    pub media_type: MediaType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    pub status: WatchStatus,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub personal_rating: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of a PATCH against `user_library`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl LibraryRow {
    pub fn from_item(user_id: &str, item: &LibraryItem, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            media_id: item.media_id,
            media_type: item.media_type,
            title: item.title.clone(),
            name: item.name.clone(),
            poster_path: item.poster_path.clone(),
            vote_average: item.vote_average,
            release_date: item.release_date.clone(),
            first_air_date: item.first_air_date.clone(),
            status: item.status,
            added_at: item.added_at,
            updated_at,
            personal_rating: item.personal_rating,
            notes: item.notes.clone(),
        }
    }

    pub fn into_item(self) -> LibraryItem {
        LibraryItem {
            id: derive_id(self.media_type, self.media_id),
            media_id: self.media_id,
            media_type: self.media_type,
            title: self.title,
            name: self.name,
            poster_path: self.poster_path,
            vote_average: self.vote_average,
            release_date: self.release_date,
            first_air_date: self.first_air_date,
            status: self.status,
            added_at: self.added_at,
            personal_rating: self.personal_rating,
            notes: self.notes,
        }
    }

    pub fn apply(&mut self, patch: &RowPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(rating) = patch.personal_rating {
            self.personal_rating = Some(rating);
        }
        if let Some(ref notes) = patch.notes {
            self.notes = Some(notes.clone());
        }
        self.updated_at = patch.updated_at;
    }
}

impl RowPatch {
    pub fn new(update: &ItemUpdate, updated_at: DateTime<Utc>) -> Self {
        Self {
            status: update.status,
            personal_rating: update.personal_rating,
            notes: update.notes.clone(),
            updated_at,
        }
    }
}
