//! Reel Service Library
//!
//! Short-form video social backend: accounts and one-time-code login, reel
//! registration with like/view counters, the follow graph, direct messages
//! and the chat contact list derived from them.

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod repository;
pub mod security;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
