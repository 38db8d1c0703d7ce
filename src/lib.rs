//! Slack launcher workflow backend.
//!
//! Keeps a locally persisted snapshot of a Slack workspace (identity, channels,
//! users, presence, custom emoji) fresh enough for filter-as-you-type commands,
//! and performs the few mutating actions those commands need.

pub mod api;
pub mod cache;
pub mod config;
pub mod emoji;
pub mod errors;
pub mod models;
pub mod refresh;
pub mod session;

pub use api::{SlackApi, SlackClient};
pub use cache::Snapshot;
pub use config::{Config, Credentials};
pub use errors::{AppError, AppResult};
pub use refresh::{Coordinator, RefreshOutcome};
pub use session::Session;

#[cfg(test)]
mod tests;
