//! Twitch Helix API integration
//!
//! All authenticated communication with the streaming platform. The client
//! hides the app-token lifecycle and request batching; callers see typed
//! payloads only.

pub mod client;
pub mod models;

pub use client::{LiveSource, SubjectResolver, TwitchClient};
pub use models::{StreamSnapshot, TwitchUser};
