use std::{fmt, str::FromStr};

use thiserror::Error;

/// Longest accepted record name, in characters.
pub const MAX_DESTINATION_LEN: usize = 64;

/// Why a user-supplied record name was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidDestination {
    #[error("the name is empty")]
    Empty,

    #[error("the name is longer than {MAX_DESTINATION_LEN} characters")]
    TooLong,

    #[error("the name must not start with '.'")]
    Reserved,

    #[error("'{0}' is not allowed; use letters, digits, '-', '_' or '.'")]
    InvalidChar(char),
}

/// A validated record name.
///
/// Only letters, digits, `-`, `_` and `.` are allowed and the name cannot
/// start with a dot, so it always names a plain file inside the records
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationName(String);

impl DestinationName {
    pub fn parse(raw: &str) -> Result<Self, InvalidDestination> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(InvalidDestination::Empty);
        }
        if name.chars().count() > MAX_DESTINATION_LEN {
            return Err(InvalidDestination::TooLong);
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(InvalidDestination::InvalidChar(bad));
        }
        if name.starts_with('.') {
            return Err(InvalidDestination::Reserved);
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name inside the records directory (`<name>.txt`).
    pub fn file_name(&self) -> String {
        format!("{}.txt", self.0)
    }
}

impl FromStr for DestinationName {
    type Err = InvalidDestination;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DestinationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
