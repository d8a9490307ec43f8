pub mod api;
pub mod auth;
pub mod client;

pub use auth::{auth_error_message, SignUpOutcome};
pub use client::SupabaseClient;
