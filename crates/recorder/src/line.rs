use std::fmt;

use chrono::{NaiveTime, Timelike};

/// One rendered record entry.
///
/// Renders as `[H:MM] [*] author: body \n`, with the `[*]` marker left empty
/// for messages that were not edited. The trailing space before the newline
/// is part of the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub time: NaiveTime,
    pub edited: bool,
    pub author: String,
    pub body: String,
}

impl LogLine {
    pub fn new(
        time: NaiveTime,
        edited: bool,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            time,
            edited,
            author: author.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.edited {
            "[*]"
        } else {
            ""
        };
        writeln!(
            f,
            "[{}:{:02}] {marker} {}: {} ",
            self.time.hour(),
            self.time.minute(),
            self.author,
            self.body
        )
    }
}
