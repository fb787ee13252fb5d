use {async_trait::async_trait, recordbot_common::ChannelId};

use crate::Result;

/// Platform-assigned id of a message the bot posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// Send messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, channel: &ChannelId, text: &str) -> Result<MessageRef>;

    async fn pin_message(&self, channel: &ChannelId, message: &MessageRef) -> Result<()>;
}
