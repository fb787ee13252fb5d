//! Discord event handler for serenity.
//!
//! Every message and edit in a recorded channel is routed to the recorder;
//! messages from people are also checked for commands.

use std::sync::Arc;

use {
    serenity::{
        all::{
            ChannelId as DiscordChannelId, Context, EventHandler, GatewayIntents, GuildId,
            Message, MessageUpdateEvent, Ready, User,
        },
        async_trait,
        utils::{ContentSafeOptions, content_safe},
    },
    tracing::{debug, info, warn},
};

use {
    recordbot_channels::CommandHandler,
    recordbot_recorder::{EventRouter, MessageEvent, MessageKind},
};

use crate::outbound::channel_key;

/// Handler for Discord gateway events.
pub struct RecordHandler {
    pub commands: Arc<CommandHandler>,
    pub router: Arc<EventRouter>,
    pub record_bot_messages: bool,
}

/// Author and cleaned text of a message, independent of the serenity type
/// that carried them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound<'a> {
    pub channel: DiscordChannelId,
    pub author: &'a str,
    pub author_is_bot: bool,
    pub body: String,
    pub edited_at: Option<i64>,
}

impl RecordHandler {
    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }

    /// Build the recorder event for an inbound message, or `None` when the
    /// author's messages are not recorded.
    pub fn to_event(&self, inbound: Inbound<'_>, kind: MessageKind) -> Option<MessageEvent> {
        if inbound.author_is_bot && !self.record_bot_messages {
            return None;
        }
        Some(MessageEvent {
            channel: channel_key(inbound.channel),
            kind,
            author: inbound.author.to_string(),
            body: inbound.body,
            edited_at: inbound.edited_at,
        })
    }

    async fn record(&self, inbound: Inbound<'_>, kind: MessageKind) {
        if let Some(event) = self.to_event(inbound, kind) {
            self.router.route(&event).await;
        }
    }
}

/// Pick author and text for an edit. The update payload wins; the cached
/// message fills in what the payload left out. Updates without text (embed
/// unfurls) are not edits.
fn edited_parts<'a>(
    new: Option<&'a Message>,
    event: &'a MessageUpdateEvent,
) -> Option<(&'a User, &'a str, &'a [User])> {
    let content = event.content.as_deref()?;
    let author = event.author.as_ref().or(new.map(|m| &m.author))?;
    let mentions = event
        .mentions
        .as_deref()
        .or(new.map(|m| m.mentions.as_slice()))
        .unwrap_or_default();
    Some((author, content, mentions))
}

#[async_trait]
impl EventHandler for RecordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let inbound = Inbound {
            channel: msg.channel_id,
            author: &msg.author.name,
            author_is_bot: msg.author.bot,
            body: msg.content_safe(&ctx.cache),
            edited_at: msg.edited_timestamp.map(|t| t.unix_timestamp()),
        };
        self.record(inbound, MessageKind::Created).await;

        // Bots never drive commands, including this one.
        if msg.author.bot {
            return;
        }
        let channel = channel_key(msg.channel_id);
        if let Err(e) = self.commands.handle_text(&channel, &msg.content).await {
            warn!(channel_id = %channel, error = %e, "failed to run command");
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some((author, content, mentions)) = edited_parts(new.as_ref(), &event) else {
            debug!(channel_id = %event.channel_id, "ignoring message update without text");
            return;
        };
        let inbound = Inbound {
            channel: event.channel_id,
            author: &author.name,
            author_is_bot: author.bot,
            body: content_safe(&ctx.cache, content, &ContentSafeOptions::default(), mentions),
            edited_at: event.edited_timestamp.map(|t| t.unix_timestamp()),
        };
        self.record(inbound, MessageKind::Edited).await;
    }
}
