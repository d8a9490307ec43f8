use crate::output::{Output, OutputNotifier};
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use library_sync_config::{Config, PathManager};
use library_sync_core::{CachePolicy, LibrarySyncStore};
use library_sync_sources::{SupabaseClient, TmdbClient};
use std::sync::Arc;

/// Everything a command needs to talk to the backends
pub struct Session {
    pub config: Config,
    pub paths: PathManager,
    pub supabase: Arc<SupabaseClient>,
}

impl Session {
    pub fn open() -> Result<Self> {
        let paths = PathManager::default();
        let config = load_config(&paths)?;
        let supabase = SupabaseClient::new(&config.supabase)
            .with_credentials_file(paths.credentials_file())
            .map_err(|e| eyre!("Failed to load credentials from {}: {}", paths.credentials_file().display(), e))?;

        Ok(Self {
            config,
            paths,
            supabase: Arc::new(supabase),
        })
    }

    pub fn tmdb(&self) -> TmdbClient {
        TmdbClient::new(&self.config.tmdb)
    }

    /// A store for this session that reports through `output`
    pub fn store(&self, output: &Output) -> LibrarySyncStore {
        LibrarySyncStore::new(
            self.supabase.clone(),
            self.supabase.clone(),
            CachePolicy::from(&self.config.cache),
        )
        .with_notifier(Arc::new(OutputNotifier::new(*output)))
    }
}

/// Config file plus environment overrides.
///
/// A missing file is fine as long as the environment supplies every value.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    let mut config = if config_file.exists() {
        Config::load_from_file(&config_file)
            .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?
    } else {
        tracing::debug!(path = %config_file.display(), "No config file, relying on environment");
        Config::template()
    };
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| eyre!("{}", e))
        .wrap_err("Run 'cinemora config init' and fill in your Supabase and TMDB credentials")?;
    Ok(config)
}
