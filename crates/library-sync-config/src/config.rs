use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub supabase: SupabaseConfig,
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub dashboard: DashboardPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_library_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    pub access_token: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Freshness policy for the in-memory library cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Reads inside this window are served from memory
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
    /// Entries untouched for this long are evicted
    #[serde(default = "default_gc_time_secs")]
    pub gc_time_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardDensity {
    Compact,
    #[default]
    Normal,
    Spacious,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PosterSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Board display preferences, passed explicitly to the UI layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DashboardPreferences {
    #[serde(default)]
    pub density: CardDensity,
    #[serde(default)]
    pub poster_size: PosterSize,
}

fn default_library_table() -> String {
    "user_library".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_stale_time_secs() -> u64 {
    300  // 5 minutes
}

fn default_gc_time_secs() -> u64 {
    600  // 10 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time_secs(),
            gc_time_secs: default_gc_time_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_time_secs)
    }
}

impl PosterSize {
    /// TMDB image width segment for this size
    pub fn tmdb_size(&self) -> &'static str {
        match self {
            PosterSize::Small => "w92",
            PosterSize::Medium => "w185",
            PosterSize::Large => "w342",
        }
    }
}

impl FromStr for CardDensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(CardDensity::Compact),
            "normal" => Ok(CardDensity::Normal),
            "spacious" => Ok(CardDensity::Spacious),
            other => Err(format!("Invalid density '{}' (expected compact, normal or spacious)", other)),
        }
    }
}

impl FromStr for PosterSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(PosterSize::Small),
            "medium" => Ok(PosterSize::Medium),
            "large" => Ok(PosterSize::Large),
            other => Err(format!("Invalid poster size '{}' (expected small, medium or large)", other)),
        }
    }
}

impl DashboardPreferences {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Config {
    /// Template written by `config init`; placeholders fail validation
    pub fn template() -> Self {
        Self {
            supabase: SupabaseConfig {
                url: "https://YOUR_PROJECT.supabase.co".to_string(),
                anon_key: "YOUR_ANON_KEY".to_string(),
                table: default_library_table(),
            },
            tmdb: TmdbConfig {
                access_token: "YOUR_TMDB_ACCESS_TOKEN".to_string(),
                language: default_language(),
            },
            cache: CacheConfig::default(),
            dashboard: DashboardPreferences::default(),
        }
    }

    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over the file (SUPABASE_URL, SUPABASE_ANON_KEY, TMDB_ACCESS_TOKEN)
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = non_empty("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }
        if let Some(token) = non_empty("TMDB_ACCESS_TOKEN") {
            self.tmdb.access_token = token;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.supabase.url.is_empty() || self.supabase.url.contains("YOUR_PROJECT") {
            return Err(anyhow::anyhow!("supabase.url is not configured"));
        }
        if !self.supabase.url.starts_with("http://") && !self.supabase.url.starts_with("https://") {
            return Err(anyhow::anyhow!("supabase.url must start with http:// or https://"));
        }
        if self.supabase.anon_key.is_empty() || self.supabase.anon_key == "YOUR_ANON_KEY" {
            return Err(anyhow::anyhow!("supabase.anon_key is not configured"));
        }
        if self.supabase.table.is_empty() {
            return Err(anyhow::anyhow!("supabase.table cannot be empty"));
        }
        if self.tmdb.access_token.is_empty() || self.tmdb.access_token == "YOUR_TMDB_ACCESS_TOKEN" {
            return Err(anyhow::anyhow!("tmdb.access_token is not configured"));
        }
        if self.cache.gc_time_secs < self.cache.stale_time_secs {
            return Err(anyhow::anyhow!("cache.gc_time_secs must be at least cache.stale_time_secs"));
        }
        Ok(())
    }
}
