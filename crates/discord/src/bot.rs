use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    serenity::{
        Client,
        all::{Http, ShardManager},
    },
    tracing::info,
};

use {
    recordbot_channels::{BotInfo, CommandHandler},
    recordbot_config::DiscordConfig,
    recordbot_recorder::{EventRouter, SessionRegistry},
};

use crate::{Error, Result, handler::RecordHandler, outbound::DiscordOutbound};

/// A configured, not yet connected Discord client.
pub struct DiscordBot {
    client: Client,
}

impl DiscordBot {
    /// Build the gateway client and wire commands and recording into it.
    pub async fn build(config: &DiscordConfig, registry: Arc<SessionRegistry>) -> Result<Self> {
        let token = config.token.expose_secret();
        if token.trim().is_empty() {
            return Err(Error::message("discord token is not configured"));
        }

        let outbound = Arc::new(DiscordOutbound::new(Arc::new(Http::new(token))));
        let info = BotInfo {
            name: config.name.clone(),
            description: config.description.clone(),
            owner: config.owner.clone(),
            prefix: config.prefix.clone(),
        };
        let handler = RecordHandler {
            commands: Arc::new(CommandHandler::new(
                Arc::clone(&registry),
                outbound.clone(),
                info,
            )),
            router: Arc::new(EventRouter::new(registry).with_reporter(outbound)),
            record_bot_messages: config.record_bot_messages,
        };

        let client = Client::builder(token, RecordHandler::intents())
            .event_handler(handler)
            .await?;
        Ok(Self { client })
    }

    /// Handle for stopping the gateway connection from another task.
    pub fn shard_manager(&self) -> Arc<ShardManager> {
        Arc::clone(&self.client.shard_manager)
    }

    /// Connect and process events until the shards shut down.
    pub async fn run(mut self) -> Result<()> {
        info!("connecting to discord");
        self.client.start().await?;
        info!("discord connection closed");
        Ok(())
    }
}
