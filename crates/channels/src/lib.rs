//! Platform-neutral bot commands.
//!
//! Parses prefixed command text (`!record start notes`) and drives the
//! session registry, posting acknowledgments through a [`ChannelOutbound`]
//! that each platform adapter implements.

pub mod commands;
pub mod error;
pub mod handler;
pub mod outbound;

pub use {
    commands::{Command, CommandError, RecordAction},
    error::{Error, Result},
    handler::{BotInfo, CommandHandler},
    outbound::{ChannelOutbound, MessageRef},
};
