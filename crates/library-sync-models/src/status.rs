use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Board column an item is placed in. These four values are the only ones
/// ever persisted or rendered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    /// Want to watch (the default column for new items)
    ToWatch,
    /// Currently watching
    Watching,
    /// Finished watching
    Watched,
    /// Paused
    OnHold,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status '{0}' (expected one of: to_watch, watching, watched, on_hold)")]
pub struct ParseStatusError(pub String);

impl WatchStatus {
    pub const ALL: [WatchStatus; 4] = [
        WatchStatus::ToWatch,
        WatchStatus::Watching,
        WatchStatus::Watched,
        WatchStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::ToWatch => "to_watch",
            WatchStatus::Watching => "watching",
            WatchStatus::Watched => "watched",
            WatchStatus::OnHold => "on_hold",
        }
    }

    /// Column heading used on the board
    pub fn label(&self) -> &'static str {
        match self {
            WatchStatus::ToWatch => "To Watch",
            WatchStatus::Watching => "Watching",
            WatchStatus::Watched => "Watched",
            WatchStatus::OnHold => "On Hold",
        }
    }
}

impl Default for WatchStatus {
    fn default() -> Self {
        WatchStatus::ToWatch
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "to_watch" => Ok(WatchStatus::ToWatch),
            "watching" => Ok(WatchStatus::Watching),
            "watched" => Ok(WatchStatus::Watched),
            "on_hold" => Ok(WatchStatus::OnHold),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_statuses() {
        for status in WatchStatus::ALL {
            assert_eq!(status.as_str().parse::<WatchStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert!("completed".parse::<WatchStatus>().is_err());
        assert!("To_Watch".parse::<WatchStatus>().is_err());
        assert!("".parse::<WatchStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&WatchStatus::OnHold).unwrap();
        assert_eq!(json, "\"on_hold\"");
        let parsed: WatchStatus = serde_json::from_str("\"to_watch\"").unwrap();
        assert_eq!(parsed, WatchStatus::ToWatch);
        assert!(serde_json::from_str::<WatchStatus>("\"dropped\"").is_err());
    }
}
