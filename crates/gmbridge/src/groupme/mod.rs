//! GroupMe remote API client module.
//!
//! Presents one uniform bidirectional-pagination contract over the two
//! structurally different GroupMe history endpoints (group vs direct, with
//! different cursor parameter names and default limits).

mod client;
mod error;
mod types;

use async_trait::async_trait;

pub use client::{DEFAULT_API_BASE, GROUP_MESSAGE_LIMIT, GroupMeClient, LIST_PAGE_SIZE};
pub use error::{GroupMeError, GroupMeResult};
pub use types::{
    Chat, Cursor, DirectMessagePage, Envelope, Group, GroupMeId, Member, MessagePage, Message,
    Meta, RemoteUser,
};

/// History pagination and membership surface, abstracted for testability.
/// The bridge core depends on this boundary, not on the concrete client's
/// shape.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    async fn list_all_groups(&self) -> GroupMeResult<Vec<Group>>;
    async fn list_all_contacts(&self) -> GroupMeResult<Vec<RemoteUser>>;
    async fn list_all_chats(&self) -> GroupMeResult<Vec<Chat>>;
    async fn load_messages_after(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        last_from_me: bool,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>>;
    async fn load_messages_before(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>>;
    async fn remove_member(&self, user: &GroupMeId, group: &GroupMeId) -> GroupMeResult<()>;
}

#[async_trait]
impl HistoryApi for GroupMeClient {
    async fn list_all_groups(&self) -> GroupMeResult<Vec<Group>> {
        self.list_all_groups().await
    }

    async fn list_all_contacts(&self) -> GroupMeResult<Vec<RemoteUser>> {
        self.list_all_contacts().await
    }

    async fn list_all_chats(&self) -> GroupMeResult<Vec<Chat>> {
        self.list_all_chats().await
    }

    async fn load_messages_after(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        last_from_me: bool,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>> {
        self.load_messages_after(conversation, last_id, last_from_me, direct).await
    }

    async fn load_messages_before(
        &self,
        conversation: &GroupMeId,
        last_id: &GroupMeId,
        direct: bool,
    ) -> GroupMeResult<Vec<Message>> {
        self.load_messages_before(conversation, last_id, direct).await
    }

    async fn remove_member(&self, user: &GroupMeId, group: &GroupMeId) -> GroupMeResult<()> {
        self.remove_member(user, group).await
    }
}
