use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use caretalk_types::api::{
    AddMembersRequest, ApiErrorBody, ChannelData, ChannelQueryRequest, OutgoingMessage,
    QueryChannelsRequest, QueryChannelsResponse, QueryUsersPayload, QueryUsersResponse,
    SendMessageRequest, SendMessageResponse, SortField, UpsertUsersRequest,
};
use caretalk_types::models::MessageSender;
use caretalk_types::{ChannelState, Device, MessageRecord, Platform, Role, UserRecord};

use crate::backend::{ChatBackend, EnsuredChannel, MembershipOutcome};
use crate::config::Config;
use crate::error::{Result, StreamError};
use crate::token;

/// Page size for the purge sweep.
pub const PURGE_PAGE_SIZE: u32 = 30;

/// Courtesy pause between purge pages so we stay under the backend's rate
/// limits. Not a correctness mechanism.
const PURGE_PAGE_PAUSE: Duration = Duration::from_millis(100);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side client for the hosted chat backend.
///
/// Holds one `reqwest::Client` and a pre-minted server token; every request
/// carries the API key as a query parameter and the server token in the
/// `Authorization` header.
pub struct StreamClient {
    http: reqwest::Client,
    config: Config,
    server_token: String,
}

impl StreamClient {
    pub fn new(config: Config) -> Result<Self> {
        let server_token = token::mint_server_token(&config.api_secret)?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config, server_token })
    }

    pub fn channel_type(&self) -> &str {
        &self.config.channel_type
    }

    /// Mints a client-side auth token for the given user. Fatal to user
    /// creation if it fails.
    pub fn mint_user_token(&self, user_id: &str) -> Result<String> {
        Ok(token::mint_user_token(&self.config.api_secret, user_id)?)
    }

    // -- Users --

    /// Exact-id lookup, limited to one result.
    pub async fn query_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let payload = serde_json::to_string(&QueryUsersPayload::by_id(id))?;
        let resp: QueryUsersResponse = self
            .send(
                self.request(Method::GET, "/users")
                    .query(&[("payload", payload.as_str())]),
            )
            .await?;
        Ok(resp.users.into_iter().next())
    }

    pub async fn ensure_user(&self, id: &str, name: &str) -> Result<UserRecord> {
        if let Some(existing) = self.query_user(id).await? {
            info!(user_id = %id, name = %existing.name, "user already exists");
            return Ok(existing);
        }

        let user_token = self.mint_user_token(id)?;
        debug!(user_id = %id, "minted client auth token");

        let user = UserRecord {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::User,
            token: Some(user_token),
        };
        let _: serde_json::Value = self
            .send(
                self.request(Method::POST, "/users")
                    .json(&UpsertUsersRequest::single(user.clone())),
            )
            .await?;
        info!(user_id = %id, name = %name, "user created");
        Ok(user)
    }

    // -- Devices --

    /// Registers a push device, mapping the platform to the backend's push
    /// provider. No-op (and no request) on an empty device id.
    pub async fn register_device(
        &self,
        user_id: &str,
        device_id: &str,
        platform: Platform,
    ) -> Result<()> {
        if device_id.is_empty() {
            debug!(user_id = %user_id, "no device id, skipping registration");
            return Ok(());
        }

        let device = Device {
            id: device_id.to_string(),
            push_provider: platform.push_provider().to_string(),
            user_id: user_id.to_string(),
            push_provider_name: Some(platform.push_provider_name().to_string()),
        };
        let _: serde_json::Value = self
            .send(self.request(Method::POST, "/devices").json(&device))
            .await?;
        info!(user_id = %user_id, platform = %platform, "push device registered");
        Ok(())
    }

    // -- Channels --

    /// Read-only channel lookup. A missing channel surfaces as an error for
    /// which [`StreamError::is_not_found`] is true.
    pub async fn get_channel(&self, id: &str) -> Result<ChannelState> {
        self.send(
            self.request(Method::POST, &self.channel_path(id, "/query"))
                .json(&ChannelQueryRequest { state: true, data: None }),
        )
        .await
    }

    async fn create_channel(&self, id: &str, data: ChannelData) -> Result<ChannelState> {
        self.send(
            self.request(Method::POST, &self.channel_path(id, "/query"))
                .json(&ChannelQueryRequest { state: true, data: Some(data) }),
        )
        .await
    }

    async fn add_members(&self, id: &str, members: &[String]) -> Result<()> {
        let _: serde_json::Value = self
            .send(
                self.request(Method::POST, &self.channel_path(id, ""))
                    .json(&AddMembersRequest { add_members: members.to_vec() }),
            )
            .await?;
        Ok(())
    }

    /// Fetches the channel by id, creating it with the given members and
    /// creator if the backend reports it missing. For an existing channel,
    /// only members not already present are added; an add-members failure is
    /// reported as [`MembershipOutcome::Warning`], never as an error.
    pub async fn ensure_channel(
        &self,
        id: &str,
        name: &str,
        created_by: &str,
        members: &[String],
    ) -> Result<EnsuredChannel> {
        match self.get_channel(id).await {
            Ok(state) => {
                info!(channel_id = %id, "channel exists");
                let missing: Vec<String> = members
                    .iter()
                    .filter(|m| !state.members.iter().any(|p| &p.user_id == *m))
                    .cloned()
                    .collect();
                if missing.is_empty() {
                    return Ok(EnsuredChannel {
                        state,
                        membership: MembershipOutcome::AlreadyComplete,
                    });
                }
                match self.add_members(id, &missing).await {
                    Ok(()) => {
                        info!(channel_id = %id, members = ?missing, "members added");
                        Ok(EnsuredChannel { state, membership: MembershipOutcome::Added(missing) })
                    }
                    Err(err) => Ok(EnsuredChannel {
                        state,
                        membership: MembershipOutcome::Warning(err.to_string()),
                    }),
                }
            }
            Err(err) if err.is_not_found() => {
                let data = ChannelData {
                    name: Some(name.to_string()),
                    created_by_id: Some(created_by.to_string()),
                    members: members.to_vec(),
                };
                let state = self.create_channel(id, data).await?;
                info!(channel_id = %id, "channel created");
                Ok(EnsuredChannel { state, membership: MembershipOutcome::Created })
            }
            Err(err) => Err(err),
        }
    }

    // -- Messages --

    /// Fetch-or-create the channel (id only, no members), then append the
    /// message attributed to `{sender_id, sender_name}`.
    pub async fn post_message(
        &self,
        channel_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<MessageRecord> {
        match self.get_channel(channel_id).await {
            Ok(_) => debug!(channel_id = %channel_id, "channel exists"),
            Err(err) if err.is_not_found() => {
                let data = ChannelData {
                    name: None,
                    created_by_id: Some(sender_id.to_string()),
                    members: Vec::new(),
                };
                self.create_channel(channel_id, data).await?;
                info!(channel_id = %channel_id, "channel created before send");
            }
            Err(err) => return Err(err),
        }

        let req = SendMessageRequest {
            message: OutgoingMessage {
                text: text.to_string(),
                user: MessageSender {
                    id: sender_id.to_string(),
                    name: Some(sender_name.to_string()),
                },
            },
        };
        let resp: SendMessageResponse = self
            .send(
                self.request(Method::POST, &self.channel_path(channel_id, "/message"))
                    .json(&req),
            )
            .await?;
        info!(channel_id = %channel_id, message_id = %resp.message.id, "message sent");
        Ok(resp.message)
    }

    // -- Maintenance --

    /// Deletes every channel in the backend, page by page. Pages are sorted
    /// by most recent activity and re-queried from the top after each sweep;
    /// a short page means we are done. Returns the number deleted.
    pub async fn delete_all_channels(&self) -> Result<usize> {
        let mut deleted = 0usize;
        loop {
            let page = self.query_channels(PURGE_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            debug!(page_len, "purging channel page");
            for state in &page {
                self.delete_channel(&state.channel.channel_type, &state.channel.id).await?;
                info!(cid = %state.channel.cid, "channel deleted");
                deleted += 1;
            }
            if (page_len as u32) < PURGE_PAGE_SIZE {
                break;
            }
            tokio::time::sleep(PURGE_PAGE_PAUSE).await;
        }
        info!(deleted, "channel purge complete");
        Ok(deleted)
    }

    async fn query_channels(&self, limit: u32) -> Result<Vec<ChannelState>> {
        let req = QueryChannelsRequest {
            filter_conditions: serde_json::json!({}),
            sort: vec![SortField { field: "last_message_at".to_string(), direction: -1 }],
            limit,
            state: false,
        };
        let resp: QueryChannelsResponse = self
            .send(self.request(Method::POST, "/channels").json(&req))
            .await?;
        Ok(resp.channels)
    }

    async fn delete_channel(&self, channel_type: &str, id: &str) -> Result<()> {
        let path = format!("/channels/{channel_type}/{id}");
        let _: serde_json::Value = self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    // -- Plumbing --

    fn channel_path(&self, id: &str, suffix: &str) -> String {
        format!("/channels/{}/{}{}", self.config.channel_type, id, suffix)
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.config.base_url.clone();
        url.set_path(path);
        url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .query(&[("api_key", self.config.api_key.as_str())])
            .header("Authorization", &self.server_token)
            .header("Stream-Auth-Type", "jwt")
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            let body = resp.json::<ApiErrorBody>().await.unwrap_or_default();
            Err(StreamError::api(status, body))
        }
    }
}

#[async_trait]
impl ChatBackend for StreamClient {
    async fn ensure_user(&self, id: &str, name: &str) -> Result<UserRecord> {
        StreamClient::ensure_user(self, id, name).await
    }

    async fn register_device(
        &self,
        user_id: &str,
        device_id: &str,
        platform: Platform,
    ) -> Result<()> {
        StreamClient::register_device(self, user_id, device_id, platform).await
    }

    async fn ensure_channel(
        &self,
        id: &str,
        name: &str,
        created_by: &str,
        members: &[String],
    ) -> Result<EnsuredChannel> {
        StreamClient::ensure_channel(self, id, name, created_by, members).await
    }

    async fn post_message(
        &self,
        channel_id: &str,
        sender_id: &str,
        sender_name: &str,
        text: &str,
    ) -> Result<MessageRecord> {
        StreamClient::post_message(self, channel_id, sender_id, sender_name, text).await
    }
}
