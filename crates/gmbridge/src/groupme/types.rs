//! GroupMe v3 API wire types.

use serde::{Deserialize, Serialize};

/// Opaque GroupMe identifier (user, group, chat, message, or membership).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupMeId(pub String);

impl GroupMeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical form: everything strictly before the first `@`. GroupMe
    /// hands out composite identifiers like `12345@groupme.com` in some
    /// places; only the plain prefix is valid as a query key or for
    /// persistence. Identifiers without `@` are returned unchanged.
    pub fn canonical(&self) -> GroupMeId {
        match self.0.find('@') {
            Some(index) => GroupMeId(self.0[..index].to_string()),
            None => self.clone(),
        }
    }
}

impl std::fmt::Display for GroupMeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GroupMeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for GroupMeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Pagination reference point within a conversation's message sequence.
///
/// Group history uses `after_id`/`before_id`; direct history uses
/// `since_id`/`before_id`. The client maps each variant to the parameter the
/// matching endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    After(GroupMeId),
    Before(GroupMeId),
    Since(GroupMeId),
}

impl Cursor {
    /// Wire query parameter name and reference id for this cursor.
    pub fn param(&self) -> (&'static str, &GroupMeId) {
        match self {
            Cursor::After(id) => ("after_id", id),
            Cursor::Before(id) => ("before_id", id),
            Cursor::Since(id) => ("since_id", id),
        }
    }
}

/// Standard GroupMe response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: Option<T>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A GroupMe group conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupMeId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    pub creator_user_id: Option<GroupMeId>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Group {
    /// Find the membership entry for a GroupMe user id, if any.
    pub fn member_by_user_id(&self, user_id: &GroupMeId) -> Option<&Member> {
        self.members.iter().find(|member| &member.user_id == user_id)
    }
}

/// A group membership entry. `id` is the membership id, distinct from the
/// member's user id, and is what removal operations key on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: GroupMeId,
    pub user_id: GroupMeId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub muted: bool,
    pub image_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A direct-message conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub messages_count: u64,
    pub other_user: RemoteUser,
    pub last_message: Option<Message>,
}

/// A GroupMe user as seen in relation and chat listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: GroupMeId,
    #[serde(default)]
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A message in either a group or a direct conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: GroupMeId,
    pub source_guid: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub created_at: i64,
    pub user_id: Option<GroupMeId>,
    #[serde(default)]
    pub name: String,
    pub avatar_url: Option<String>,
    pub text: Option<String>,
    #[serde(default)]
    pub system: bool,
    pub sender_type: Option<String>,
    pub group_id: Option<GroupMeId>,
    pub recipient_id: Option<GroupMeId>,
    #[serde(default)]
    pub favorited_by: Vec<GroupMeId>,
}

/// Payload of a group message listing.
#[derive(Debug, Default, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Payload of a direct message listing.
#[derive(Debug, Default, Deserialize)]
pub struct DirectMessagePage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub direct_messages: Vec<Message>,
}
