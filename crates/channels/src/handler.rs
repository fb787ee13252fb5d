//! Command execution against the session registry.

use std::sync::Arc;

use {
    recordbot_common::ChannelId,
    recordbot_recorder::{DestinationName, SessionRegistry, StartError, StopError},
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    commands::{self, Command, RecordAction},
    outbound::ChannelOutbound,
};

pub const PONG: &str = "Pong!";
pub const RECORDING_STARTED: &str = "This channel is now being recorded.";
pub const ALREADY_RECORDING: &str = "This channel is already being recorded. Please stop the current record before trying to initiate a new one.";
pub const RECORDING_STOPPED: &str = "This channel is no longer being recorded.";
pub const NOT_RECORDING: &str = "The current channel is not being recorded.";
pub const SHUTTING_DOWN: &str = "Record Bot is shutting down and cannot start a new record.";

/// Identity shown by `help`.
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub name: String,
    pub description: String,
    pub owner: Option<String>,
    pub prefix: String,
}

impl Default for BotInfo {
    fn default() -> Self {
        Self {
            name: "Record Bot".into(),
            description: "A Discord bot that records channel messages.".into(),
            owner: None,
            prefix: "!".into(),
        }
    }
}

/// Runs parsed commands for one platform connection.
pub struct CommandHandler {
    registry: Arc<SessionRegistry>,
    outbound: Arc<dyn ChannelOutbound>,
    info: BotInfo,
}

impl CommandHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        outbound: Arc<dyn ChannelOutbound>,
        info: BotInfo,
    ) -> Self {
        Self {
            registry,
            outbound,
            info,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.info.prefix
    }

    /// Parse and run `text` if it is a command. Returns whether it was one.
    pub async fn handle_text(&self, channel: &ChannelId, text: &str) -> Result<bool> {
        match commands::parse(&self.info.prefix, text) {
            None => Ok(false),
            Some(Ok(command)) => {
                self.handle(channel, command).await?;
                Ok(true)
            },
            Some(Err(e)) => {
                self.reply(channel, &e.usage_text(&self.info.prefix))
                    .await?;
                Ok(true)
            },
        }
    }

    pub async fn handle(&self, channel: &ChannelId, command: Command) -> Result<()> {
        debug!(channel_id = %channel, ?command, "handling command");
        match command {
            Command::Ping => self.reply(channel, PONG).await,
            Command::Help => self.reply(channel, &self.help_text()).await,
            Command::Topic(topic) => {
                let posted = self.outbound.send_text(channel, &topic).await?;
                self.outbound.pin_message(channel, &posted).await
            },
            Command::Record(RecordAction::Start(name)) => {
                let reply = self.start_recording(channel, &name).await;
                self.reply(channel, &reply).await
            },
            Command::Record(RecordAction::Stop) => {
                let reply = self.stop_recording(channel).await;
                self.reply(channel, reply).await
            },
        }
    }

    /// Validate `raw_name` and start recording. Returns the reply text.
    pub async fn start_recording(&self, channel: &ChannelId, raw_name: &str) -> String {
        let destination = match DestinationName::parse(raw_name) {
            Ok(name) => name,
            Err(e) => return format!("Invalid record name: {e}"),
        };

        info!(channel_id = %channel, destination = %destination, "starting recording");
        match self.registry.start(channel.clone(), destination).await {
            Ok(_) => RECORDING_STARTED.into(),
            Err(StartError::AlreadyRecording) => ALREADY_RECORDING.into(),
            Err(StartError::ShuttingDown) => SHUTTING_DOWN.into(),
            Err(StartError::Open(e)) => {
                warn!(channel_id = %channel, error = %e, "could not open record");
                format!("Record Bot could not open the record: {e}")
            },
        }
    }

    /// Stop recording. Returns the reply text.
    pub async fn stop_recording(&self, channel: &ChannelId) -> &'static str {
        match self.registry.stop(channel).await {
            Ok(()) => RECORDING_STOPPED,
            Err(StopError::NotRecording) => NOT_RECORDING,
        }
    }

    pub fn help_text(&self) -> String {
        let BotInfo {
            name,
            description,
            owner,
            prefix,
        } = &self.info;
        let mut text = format!("**{name}** - {description}\n");
        if let Some(owner) = owner {
            text.push_str(&format!("by {owner}\n"));
        }
        text.push_str(&format!(
            "\n{prefix}help - Shows this list.\n\
             {prefix}ping - Pings the bot.\n\
             {prefix}record start <FileName> - Starts recording this channel.\n\
             {prefix}record stop - Stops recording this channel.\n\
             {prefix}topic <TopicTitle> - Sets the topic and pins it to the channel."
        ));
        text
    }

    async fn reply(&self, channel: &ChannelId, text: &str) -> Result<()> {
        self.outbound.send_text(channel, text).await.map(|_| ())
    }
}
