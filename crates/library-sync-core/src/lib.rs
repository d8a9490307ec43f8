pub mod error;
pub mod journal;
pub mod notify;
pub mod outcome;
pub mod query_cache;
pub mod store;

pub use error::StoreError;
pub use notify::{Notification, NotificationKind, Notifier, TracingNotifier};
pub use outcome::MutationOutcome;
pub use query_cache::{CachePolicy, QueryCache};
pub use store::LibrarySyncStore;
