use async_trait::async_trait;
use caretalk_types::{ChannelState, MessageRecord, Platform, UserRecord};

use crate::error::Result;

/// What happened to the channel's member set during an ensure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// Channel was created fresh with the full member set.
    Created,
    /// Channel existed and every requested member was already present.
    AlreadyComplete,
    /// Channel existed; these members were added.
    Added(Vec<String>),
    /// Channel existed but adding members failed. Not fatal; the caller
    /// decides whether to log or retry.
    Warning(String),
}

#[derive(Debug)]
pub struct EnsuredChannel {
    pub state: ChannelState,
    pub membership: MembershipOutcome,
}

/// The chat-backend capabilities the provisioning flow consumes. The real
/// implementation is [`crate::StreamClient`]; tests drive the flow against
/// an in-memory fake.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the user if it exists, otherwise creates it. Idempotent by
    /// construction (lookup-then-create); repeated calls never double-create.
    async fn ensure_user(&self, id: &str, name: &str) -> Result<UserRecord>;

    /// Registers a push device for the user. No-op on an empty device id.
    async fn register_device(
        &self,
        user_id: &str,
        device_id: &str,
        platform: Platform,
    ) -> Result<()>;

    /// Returns the channel if it exists (topping up its member set),
    /// otherwise creates it with the given members and creator.
    async fn ensure_channel(
        &self,
        id: &str,
        name: &str,
        created_by: &str,
        members: &[String],
    ) -> Result<EnsuredChannel>;

    /// Appends a message attributed to `{sender_id, sender_name}`, creating
    /// the channel first if it is missing. Never dedups.
    async fn post_message(
        &self,
        channel_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<MessageRecord>;
}
