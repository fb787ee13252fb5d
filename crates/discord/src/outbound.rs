use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::all::{ChannelId as DiscordChannelId, Http, MessageId},
    tracing::{debug, warn},
};

use {
    recordbot_channels::{ChannelOutbound, Error, MessageRef, Result},
    recordbot_common::ChannelId,
    recordbot_recorder::{WriteError, WriteFailureReporter},
};

/// Parse a Discord snowflake. Zero is not a valid id.
fn snowflake(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Map a recorder channel key back to a Discord channel id.
pub fn discord_channel(channel: &ChannelId) -> Result<DiscordChannelId> {
    snowflake(channel.as_str())
        .map(DiscordChannelId::new)
        .ok_or_else(|| Error::invalid_input(format!("not a discord channel id: {channel}")))
}

/// The recorder channel key for a Discord channel.
pub fn channel_key(channel: DiscordChannelId) -> ChannelId {
    ChannelId::from(channel.get())
}

/// Sends acknowledgments and pins through the Discord REST API.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<MessageRef> {
        let target = discord_channel(channel)?;
        let sent = target
            .say(&*self.http, text)
            .await
            .map_err(|e| Error::external("send message", e))?;
        debug!(channel_id = %channel, message_id = %sent.id, "sent discord message");
        Ok(MessageRef(sent.id.to_string()))
    }

    async fn pin_message(&self, channel: &ChannelId, message: &MessageRef) -> Result<()> {
        let target = discord_channel(channel)?;
        let id = snowflake(&message.0)
            .map(MessageId::new)
            .ok_or_else(|| Error::invalid_input(format!("not a discord message id: {}", message.0)))?;
        target
            .pin(&*self.http, id)
            .await
            .map_err(|e| Error::external("pin message", e))
    }
}

#[async_trait]
impl WriteFailureReporter for DiscordOutbound {
    async fn report(&self, channel: &ChannelId, error: &WriteError) {
        let text = format!("Record Bot has experienced an error: {error}");
        if let Err(e) = self.send_text(channel, &text).await {
            warn!(channel_id = %channel, error = %e, "failed to report write failure");
        }
    }
}
