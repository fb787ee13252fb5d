//! Command text parsing.

use thiserror::Error;

/// Usage lines shown when a command is missing its argument.
pub const RECORD_USAGE: &str = "Usage:\n- {prefix}record start <FileName>\n- {prefix}record stop";
pub const TOPIC_USAGE: &str = "Usage:\n- {prefix}topic <TopicTitle>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Help,
    /// Post the text and pin it.
    Topic(String),
    Record(RecordAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// Raw, not yet validated record name.
    Start(String),
    Stop,
}

/// A known command used the wrong way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("missing argument")]
    Usage { usage: &'static str },
}

impl CommandError {
    /// Usage text with the configured prefix filled in.
    pub fn usage_text(&self, prefix: &str) -> String {
        match self {
            Self::Usage { usage } => usage.replace("{prefix}", prefix),
        }
    }
}

/// Parse `text` as a command.
///
/// Returns `None` when the text does not start with `prefix` or names no
/// known command, so ordinary chat is ignored.
pub fn parse(prefix: &str, text: &str) -> Option<Result<Command, CommandError>> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;

    let command = match name {
        "ping" => Ok(Command::Ping),
        "help" => Ok(Command::Help),
        "topic" => {
            let topic = words.collect::<Vec<_>>().join(" ");
            if topic.is_empty() {
                Err(CommandError::Usage { usage: TOPIC_USAGE })
            } else {
                Ok(Command::Topic(topic))
            }
        },
        "record" => match (words.next(), words.next()) {
            (Some("start"), Some(name)) => Ok(Command::Record(RecordAction::Start(name.into()))),
            (Some("stop"), _) => Ok(Command::Record(RecordAction::Stop)),
            _ => Err(CommandError::Usage {
                usage: RECORD_USAGE,
            }),
        },
        _ => return None,
    };
    Some(command)
}
