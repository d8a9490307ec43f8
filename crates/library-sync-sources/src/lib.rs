pub mod error;
pub mod memory;
pub mod retry;
pub mod supabase;
pub mod tmdb;
pub mod traits;

pub use error::SourceError;
pub use memory::{InMemoryLibrary, RemoteOp};
pub use retry::RetryPolicy;
pub use supabase::{auth_error_message, SignUpOutcome, SupabaseClient};
pub use tmdb::{poster_url, validate_query, TmdbClient, MAX_QUERY_LEN, MIN_QUERY_LEN, POSTER_BASE_URL};
pub use traits::{AuthUser, IdentityProvider, MetadataProvider, RemoteLibrary};
