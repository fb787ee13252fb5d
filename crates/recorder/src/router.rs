//! Dispatch of inbound message events to recorded channels.

use std::sync::Arc;

use {
    async_trait::async_trait,
    recordbot_common::ChannelId,
    tracing::{debug, trace, warn},
};

use crate::{
    clock::{Clock, SystemClock},
    error::WriteError,
    line::LogLine,
    registry::SessionRegistry,
};

/// Whether an event announces a new message or a change to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Created,
    Edited,
}

/// A platform message event, already reduced to what a record needs.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub channel: ChannelId,
    pub kind: MessageKind,
    /// Author name as it should appear in the record.
    pub author: String,
    /// Message text with mentions and markup already resolved.
    pub body: String,
    /// Unix timestamp of the last edit, when the platform reports one.
    pub edited_at: Option<i64>,
}

impl MessageEvent {
    pub fn created(
        channel: ChannelId,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            kind: MessageKind::Created,
            author: author.into(),
            body: body.into(),
            edited_at: None,
        }
    }

    pub fn edited(channel: ChannelId, author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Edited,
            ..Self::created(channel, author, body)
        }
    }

    pub fn is_edit(&self) -> bool {
        self.kind == MessageKind::Edited || self.edited_at.is_some()
    }
}

/// Receives append failures so an operator can see them.
#[async_trait]
pub trait WriteFailureReporter: Send + Sync {
    async fn report(&self, channel: &ChannelId, error: &WriteError);
}

/// What `route` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Recorded,
    /// The channel has no active session, or it stopped before the line
    /// was written; nothing was written.
    NotRecording,
    /// The append failed. The session is still active.
    Failed,
}

/// Stateless event dispatcher in front of a [`SessionRegistry`].
pub struct EventRouter {
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    reporter: Option<Arc<dyn WriteFailureReporter>>,
}

impl EventRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            reporter: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn WriteFailureReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Append `event` to its channel's record, if the channel is recorded.
    ///
    /// Write failures are logged and handed to the reporter; they never
    /// escape as errors and never end the session. A session that closes
    /// while the event is in flight counts as not recording.
    pub async fn route(&self, event: &MessageEvent) -> RouteOutcome {
        let Some(session) = self.registry.lookup(&event.channel) else {
            return RouteOutcome::NotRecording;
        };

        let line = LogLine::new(
            self.clock.now(),
            event.is_edit(),
            event.author.as_str(),
            event.body.as_str(),
        );
        match session.append(&line).await {
            Ok(()) => {
                trace!(
                    channel_id = %event.channel,
                    destination = %session.destination(),
                    edited = line.edited,
                    "message recorded"
                );
                RouteOutcome::Recorded
            },
            Err(WriteError::Closed) => {
                // Stopped between the lookup and the append.
                debug!(
                    channel_id = %event.channel,
                    destination = %session.destination(),
                    "recording stopped before message was written"
                );
                RouteOutcome::NotRecording
            },
            Err(e) => {
                warn!(
                    channel_id = %event.channel,
                    destination = %session.destination(),
                    error = %e,
                    "failed to record message"
                );
                if let Some(reporter) = &self.reporter {
                    reporter.report(&event.channel, &e).await;
                }
                RouteOutcome::Failed
            },
        }
    }
}
