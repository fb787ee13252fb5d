//! Shared types used across the recordbot crates.

pub mod types;

pub use types::ChannelId;
