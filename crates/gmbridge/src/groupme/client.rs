//! GroupMe HTTP client.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::error::{GroupMeError, GroupMeResult};
use super::types::{
    Chat, Cursor, DirectMessagePage, Envelope, Group, GroupMeId, Message, MessagePage, RemoteUser,
};
use crate::config::GroupMeConfig;

/// Production GroupMe v3 API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.groupme.com/v3";

/// Per-request timeout unless configured otherwise.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for group and chat listing requests.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Page cap for group history requests. Matches the direct-message default
/// page size so incremental sync batches are the same size in both regimes.
pub const GROUP_MESSAGE_LIMIT: u32 = 20;

/// Client for the GroupMe API, bound to one user's auth token.
#[derive(Debug, Clone)]
pub struct GroupMeClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GroupMeClient {
    /// Create a client against the production API.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Create a client against an alternate base URL (tests, proxies).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_timeout(token, base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client from the bridge's GroupMe settings.
    pub fn from_config(token: impl Into<String>, config: &GroupMeConfig) -> Self {
        Self::with_timeout(
            token,
            config.base_url.as_str(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Create a client with an explicit per-request timeout.
    pub fn with_timeout(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Fetch every group the user is in, walking pages until exhausted.
    pub async fn list_all_groups(&self) -> GroupMeResult<Vec<Group>> {
        self.fetch_all_pages("/groups").await
    }

    /// Fetch the user's relation (contact) index. Single-shot; the
    /// relationships endpoint is not paged.
    pub async fn list_all_contacts(&self) -> GroupMeResult<Vec<RemoteUser>> {
        let contacts: Vec<RemoteUser> = self.get_json("/relationships", &[]).await?;
        Ok(contacts)
    }

    /// Fetch every direct conversation, walking pages until exhausted.
    pub async fn list_all_chats(&self) -> GroupMeResult<Vec<Chat>> {
        self.fetch_all_pages("/chats").await
    }

    /// Fetch messages strictly after `last_id`, in forward chronological
    /// order. `last_from_me` is carried for the caller's dedup decisions and
    /// does not affect routing.
    pub async fn load_messages_after(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        _last_from_me: bool,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>> {
        if direct {
            self.direct_messages(conversation, Cursor::Since(last_id.clone())).await
        } else {
            self.group_messages(conversation, Cursor::After(last_id.clone())).await
        }
    }

    /// Fetch messages strictly before `last_id` (backfill direction).
    pub async fn load_messages_before(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>> {
        if direct {
            self.direct_messages(conversation, Cursor::Before(last_id.clone())).await
        } else {
            self.group_messages(conversation, Cursor::Before(last_id.clone())).await
        }
    }

    /// Look up a group's detail record, including its membership list.
    pub async fn show_group(&self, group: &GroupMeId) -> GroupMeResult<Group> {
        self.get_json(&format!("/groups/{group}"), &[]).await
    }

    /// Remove a user from a group by resolving their membership entry.
    ///
    /// Removal keys on the membership id, not the user id, so the group
    /// detail is fetched first. A user with no membership entry yields
    /// [`GroupMeError::NotAMember`] rather than a removal of anything.
    pub async fn remove_member(
        &self,
        user: &GroupMeId,
        group: &GroupMeId,
    ) -> GroupMeResult<()> {
        let detail = self.show_group(group).await?;
        let user = user.canonical();
        let membership =
            detail
                .member_by_user_id(&user)
                .ok_or_else(|| GroupMeError::NotAMember {
                    user: user.clone(),
                    group: group.clone(),
                })?;

        self.post_empty(&format!("/groups/{group}/members/{}/remove", membership.id))
            .await
    }

    async fn group_messages(
        &self,
        group: &GroupMeId,
        cursor: Cursor,
    ) -> GroupMeResult<Vec<Message>> {
        let query = message_query(&cursor, Some(GROUP_MESSAGE_LIMIT));
        let page: Option<MessagePage> = self
            .get_json_or_not_modified(&format!("/groups/{group}/messages"), &query)
            .await?;
        Ok(page.map(|page| page.messages).unwrap_or_default())
    }

    async fn direct_messages(
        &self,
        other_user: &GroupMeId,
        cursor: Cursor,
    ) -> GroupMeResult<Vec<Message>> {
        // No explicit limit: the remote default page size applies.
        let mut query = vec![("other_user_id", other_user.to_string())];
        query.extend(message_query(&cursor, None));
        let page: Option<DirectMessagePage> =
            self.get_json_or_not_modified("/direct_messages", &query).await?;
        Ok(page.map(|page| page.direct_messages).unwrap_or_default())
    }

    async fn fetch_all_pages<T: DeserializeOwned>(&self, path: &str) -> GroupMeResult<Vec<T>> {
        let mut all = Vec::new();
        let mut page: u32 = 1;
        loop {
            let batch: Vec<T> = self
                .get_json(
                    path,
                    &[
                        ("page", page.to_string()),
                        ("per_page", LIST_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let exhausted = (batch.len() as u32) < LIST_PAGE_SIZE;
            all.extend(batch);
            if exhausted {
                break;
            }
            page += 1;
        }
        debug!(path, total = all.len(), "fetched full listing");
        Ok(all)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GroupMeResult<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Access-Token", &self.token)
            .query(query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Like [`Self::get_json`], but maps HTTP 304 to `None`. GroupMe answers
    /// message listings with 304 Not Modified when nothing falls in the
    /// requested range.
    async fn get_json_or_not_modified<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GroupMeResult<Option<T>> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-Access-Token", &self.token)
            .query(query)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    async fn post_empty(&self, path: &str) -> GroupMeResult<()> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-Access-Token", &self.token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::api_error(status, response).await)
    }

    /// Unwrap the response envelope or surface the meta errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> GroupMeResult<T> {
        let status = response.status();
        if status.is_success() {
            let envelope: Envelope<T> = response
                .json()
                .await
                .map_err(|err| GroupMeError::Parse(err.to_string()))?;
            envelope
                .response
                .ok_or_else(|| GroupMeError::Parse("missing response payload".to_string()))
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn api_error(status: StatusCode, response: reqwest::Response) -> GroupMeError {
        let messages = response
            .json::<Envelope<Value>>()
            .await
            .map(|envelope| envelope.meta.errors)
            .unwrap_or_default();
        GroupMeError::Api {
            status: status.as_u16(),
            messages,
        }
    }
}

/// Build the message-listing query for a cursor. An empty cursor id means "no
/// cursor" (first sync) and emits no reference parameter; the page limit, if
/// any, is always emitted.
fn message_query(cursor: &Cursor, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    let (name, id) = cursor.param();
    if !id.is_empty() {
        query.push((name, id.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    query
}
