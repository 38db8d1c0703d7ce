//! Data models for the cached Slack state.
//!
//! These are the domain types stored in the snapshot and handed to the command
//! layer. Wire formats live in `api::wire` and are converted into these.

mod channel;
mod emoji;
mod identity;
mod pin;
mod user;

pub use channel::*;
pub use emoji::*;
pub use identity::*;
pub use pin::*;
pub use user::*;
