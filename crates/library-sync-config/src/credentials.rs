use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// A persisted auth session for the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: String,
    pub email: Option<String>,
}

pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

const SESSION_KEYS: [&str; 5] = [
    "session_access_token",
    "session_refresh_token",
    "session_expires_at",
    "session_user_id",
    "session_email",
];

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_session(&self) -> Option<StoredSession> {
        let access_token = self.get("session_access_token").filter(|t| !t.is_empty())?;
        let user_id = self.get("session_user_id")?;
        let expires_at = self
            .get("session_expires_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))?;

        Some(StoredSession {
            access_token: access_token.clone(),
            refresh_token: self.get("session_refresh_token").cloned().unwrap_or_default(),
            expires_at,
            user_id: user_id.clone(),
            email: self.get("session_email").cloned(),
        })
    }

    pub fn set_session(&mut self, session: &StoredSession) {
        self.set("session_access_token".to_string(), session.access_token.clone());
        self.set("session_refresh_token".to_string(), session.refresh_token.clone());
        self.set("session_expires_at".to_string(), session.expires_at.to_rfc3339());
        self.set("session_user_id".to_string(), session.user_id.clone());
        match session.email {
            Some(ref email) => self.set("session_email".to_string(), email.clone()),
            None => self.remove("session_email"),
        }
    }

    pub fn clear_session(&mut self) {
        for key in SESSION_KEYS {
            self.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn session() -> StoredSession {
        StoredSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            user_id: "user-1".to_string(),
            email: Some("me@example.com".to_string()),
        }
    }

    #[test]
    fn test_session_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let mut store = CredentialStore::new(path.clone());
        store.set_session(&session());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        let loaded = loaded_store.get_session().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.email.as_deref(), Some("me@example.com"));
        // Allow 1 second difference for serialization
        assert!((loaded.expires_at - session().expires_at).num_seconds().abs() < 2);
    }

    #[test]
    fn test_clear_session_keeps_other_keys() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        store.set_session(&session());
        store.set("other".to_string(), "value".to_string());

        store.clear_session();
        assert!(store.get_session().is_none());
        assert_eq!(store.get("other"), Some(&"value".to_string()));
    }

    #[test]
    fn test_session_requires_access_token() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/test"));
        let mut partial = session();
        partial.access_token = String::new();
        store.set_session(&partial);
        assert!(store.get_session().is_none());
    }
}
