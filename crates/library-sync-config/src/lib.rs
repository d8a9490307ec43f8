pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{CacheConfig, CardDensity, Config, DashboardPreferences, PosterSize, SupabaseConfig, TmdbConfig};
pub use credentials::{CredentialStore, StoredSession};
pub use paths::{PathManager, container_base_path};
