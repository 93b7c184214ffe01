use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role attached to users minted by this tool. The backend knows more roles;
/// anything we didn't create ourselves deserializes as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    #[serde(other)]
    Unknown,
}

/// A user as stored by the chat backend.
///
/// The backend keeps arbitrary extra fields on user records; everything we
/// don't care about is ignored on deserialization. `token` is a custom field
/// we attach at creation time so mobile clients can pick it up later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Mobile platform of a push-notification device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Push-provider identifier the backend expects for this platform.
    pub fn push_provider(self) -> &'static str {
        match self {
            Platform::Ios => "apn",
            Platform::Android => "firebase",
        }
    }

    /// Provider-specific configuration name registered with the backend.
    pub fn push_provider_name(self) -> &'static str {
        match self {
            Platform::Ios => "apn",
            Platform::Android => "Caretalk-Client-Android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::Android => write!(f, "Android"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown platform: {0:?}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    // The mobile apps send exactly "iOS" or "Android".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iOS" => Ok(Platform::Ios),
            "Android" => Ok(Platform::Android),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// A push-notification device registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub push_provider: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_provider_name: Option<String>,
}

/// A channel as stored by the chat backend. The backend addresses channels
/// as `type:id` (the `cid`); the bare id must therefore never contain `:`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    #[serde(default)]
    pub cid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMember {
    pub user_id: String,
}

/// Channel plus membership, as returned by a channel query.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelState {
    pub channel: ChannelRecord,
    #[serde(default)]
    pub members: Vec<ChannelMember>,
}

/// The `{id, name}` pair a message is attributed to. The name may be
/// overridden independently of the sender's stored display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A message as stored by the chat backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<MessageSender>,
}
