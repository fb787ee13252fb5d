//! Discord front end for the recorder.
//!
//! Uses serenity to receive gateway events, feeds messages and edits to the
//! recorder's event router, and answers bot commands over the REST API.

pub mod bot;
pub mod error;
pub mod handler;
pub mod outbound;

pub use {
    bot::DiscordBot,
    error::{Error, Result},
    handler::RecordHandler,
    outbound::DiscordOutbound,
};
