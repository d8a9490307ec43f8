pub mod auth;
pub mod config;
pub mod interactive;
pub mod library;
pub mod prompts;
pub mod search;
pub mod session;
pub mod ui;
