//! Config schema types for the bot (`[discord]` and `[recorder]` sections).

use std::{path::PathBuf, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordBotConfig {
    pub discord: DiscordConfig,
    pub recorder: RecorderConfig,
}

impl RecordBotConfig {
    /// Copy of the config that is safe to print: the token is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.discord.token.expose_secret().is_empty() {
            copy.discord.token = Secret::new("[REDACTED]".into());
        }
        copy
    }
}

/// Connection and command settings for the Discord bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Prefix that marks a message as a command (`!record start notes`).
    pub prefix: String,

    /// Name shown in help output.
    pub name: String,

    /// Owner shown in help output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// One-line description shown in help output.
    pub description: String,

    /// Record messages authored by bot accounts (including this bot's own
    /// acknowledgments).
    pub record_bot_messages: bool,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .field("record_bot_messages", &self.record_bot_messages)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            prefix: "!".into(),
            name: "Record Bot".into(),
            owner: None,
            description: "A Discord bot that records channel messages.".into(),
            record_bot_messages: true,
        }
    }
}

/// Where recordings are written and how long sink I/O may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory holding one `<name>.txt` file per recording.
    pub records_dir: PathBuf,
    /// Pending lines buffered per recording before appends wait.
    pub queue_capacity: usize,
    pub open_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Time a recording gets to drain queued lines at shutdown.
    pub shutdown_grace_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            records_dir: PathBuf::from("records"),
            queue_capacity: 256,
            open_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            shutdown_grace_ms: 3_000,
        }
    }
}

impl RecorderConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
