use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{ChannelState, MessageRecord, MessageSender, UserRecord};

// -- Users --

/// Filter payload for the user query endpoint. The filter language itself
/// belongs to the backend; we only ever build exact-id matches.
#[derive(Debug, Serialize)]
pub struct QueryUsersPayload {
    pub filter_conditions: serde_json::Value,
    pub limit: u32,
}

impl QueryUsersPayload {
    /// Exact-id equality filter limited to a single result.
    pub fn by_id(id: &str) -> Self {
        Self {
            filter_conditions: serde_json::json!({ "id": { "$eq": id } }),
            limit: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryUsersResponse {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

/// Upsert request. The backend takes a map of id to user record.
#[derive(Debug, Serialize)]
pub struct UpsertUsersRequest {
    pub users: HashMap<String, UserRecord>,
}

impl UpsertUsersRequest {
    pub fn single(user: UserRecord) -> Self {
        let mut users = HashMap::new();
        users.insert(user.id.clone(), user);
        Self { users }
    }
}

// -- Channels --

/// Body for the channel query endpoint. With `data` set the backend creates
/// the channel if it does not exist; without it the query is read-only.
#[derive(Debug, Serialize)]
pub struct ChannelQueryRequest {
    pub state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ChannelData>,
}

#[derive(Debug, Serialize)]
pub struct ChannelData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddMembersRequest {
    pub add_members: Vec<String>,
}

// -- Messages --

#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub message: OutgoingMessage,
}

#[derive(Debug, Serialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub user: MessageSender,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    pub message: MessageRecord,
}

// -- Channel search --

#[derive(Debug, Serialize)]
pub struct QueryChannelsRequest {
    pub filter_conditions: serde_json::Value,
    pub sort: Vec<SortField>,
    pub limit: u32,
    pub state: bool,
}

#[derive(Debug, Serialize)]
pub struct SortField {
    pub field: String,
    pub direction: i8,
}

#[derive(Debug, Deserialize)]
pub struct QueryChannelsResponse {
    #[serde(default)]
    pub channels: Vec<ChannelState>,
}

// -- Errors --

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
