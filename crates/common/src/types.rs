use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Stable, platform-assigned identifier of a chat channel.
///
/// Never a display name: two channels may share a name, and names change.
/// Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(Arc<str>);

impl ChannelId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id.to_string().into())
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_render_as_decimal() {
        let id = ChannelId::from(1_234_567_890_u64);
        assert_eq!(id.as_str(), "1234567890");
        assert_eq!(id.to_string(), "1234567890");
    }

    #[test]
    fn equal_ids_compare_equal() {
        assert_eq!(ChannelId::from("general"), ChannelId::new("general"));
        assert_ne!(ChannelId::from("general"), ChannelId::from("random"));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&ChannelId::from(42_u64)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let id: ChannelId = serde_json::from_str("\"81384788765712384\"").unwrap();
        assert_eq!(id, ChannelId::from(81_384_788_765_712_384_u64));
    }
}
