//! Bridge user data model and per-user sync caches.

use chrono::{DateTime, Utc};
use ruma::{OwnedRoomId, OwnedUserId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::groupme::{GroupMeClient, GroupMeId};

/// Key distinguishing a direct conversation from a group conversation.
///
/// The two regimes have separate cursor semantics and page limits, so cache
/// entries and pagination state are always keyed by both the conversation id
/// and its directness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub gmid: GroupMeId,
    pub direct: bool,
}

impl ConversationKey {
    pub fn group(gmid: impl Into<GroupMeId>) -> Self {
        Self { gmid: gmid.into(), direct: false }
    }

    pub fn direct(gmid: impl Into<GroupMeId>) -> Self {
        Self { gmid: gmid.into(), direct: true }
    }
}

/// A bridge user: the durable link between a Matrix user and a GroupMe
/// identity, plus that user's in-memory sync caches.
///
/// The caches are owned exclusively by this record and are never persisted;
/// they are rebuilt from authoritative state on demand after a restart. Each
/// cache has its own lock so read-marker traffic never contends with space
/// membership checks. Locks are held only for the map access itself, never
/// across an `.await`.
#[derive(Debug)]
pub struct User {
    /// Matrix user id. Immutable primary key.
    pub mxid: OwnedUserId,
    /// GroupMe identity, absent until the user first links their account.
    pub gmid: Option<GroupMeId>,
    /// GroupMe API bearer token, absent while unauthenticated.
    pub auth_token: Option<String>,
    pub management_room: Option<OwnedRoomId>,
    pub space_room: Option<OwnedRoomId>,

    last_read: Mutex<HashMap<ConversationKey, DateTime<Utc>>>,
    in_space: Mutex<HashMap<ConversationKey, bool>>,
}

impl User {
    /// Create an unlinked record for a Matrix user. Caches start empty.
    pub fn new(mxid: OwnedUserId) -> Self {
        Self {
            mxid,
            gmid: None,
            auth_token: None,
            management_room: None,
            space_room: None,
            last_read: Mutex::new(HashMap::new()),
            in_space: Mutex::new(HashMap::new()),
        }
    }

    /// Canonical GroupMe id for persistence and query keys: suffix-stripped,
    /// with the empty id mapped to absent.
    pub fn canonical_gmid(&self) -> Option<GroupMeId> {
        self.gmid
            .as_ref()
            .map(GroupMeId::canonical)
            .filter(|gmid| !gmid.is_empty())
    }

    /// Build a history client from the stored token. Absent while the user
    /// has no token.
    pub fn client(&self) -> Option<GroupMeClient> {
        self.auth_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(GroupMeClient::new)
    }

    /// Timestamp of the last message read in a conversation, if tracked.
    pub fn last_read(&self, key: &ConversationKey) -> Option<DateTime<Utc>> {
        lock(&self.last_read).get(key).copied()
    }

    pub fn set_last_read(&self, key: ConversationKey, at: DateTime<Utc>) {
        lock(&self.last_read).insert(key, at);
    }

    /// Whether the conversation's portal is known to be in the user's space.
    /// Untracked conversations report `false`.
    pub fn is_in_space(&self, key: &ConversationKey) -> bool {
        lock(&self.in_space).get(key).copied().unwrap_or(false)
    }

    pub fn set_in_space(&self, key: ConversationKey, in_space: bool) {
        lock(&self.in_space).insert(key, in_space);
    }
}

/// Cache state is reconstructible, so a poisoned lock just keeps the map.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ruma::UserId;
    use std::sync::Arc;

    fn test_user() -> User {
        User::new(UserId::parse("@alice:example.org").unwrap())
    }

    #[test]
    fn canonical_gmid_strips_at_suffix() {
        let mut user = test_user();
        user.gmid = Some(GroupMeId::from("12345@groupme.com"));
        assert_eq!(user.canonical_gmid(), Some(GroupMeId::from("12345")));

        user.gmid = Some(GroupMeId::from("12345"));
        assert_eq!(user.canonical_gmid(), Some(GroupMeId::from("12345")));

        // Only the first @ delimits the suffix.
        user.gmid = Some(GroupMeId::from("12@34@56"));
        assert_eq!(user.canonical_gmid(), Some(GroupMeId::from("12")));

        user.gmid = Some(GroupMeId::from(""));
        assert_eq!(user.canonical_gmid(), None);

        user.gmid = None;
        assert_eq!(user.canonical_gmid(), None);
    }

    #[test]
    fn last_read_roundtrip_and_absent_key() {
        let user = test_user();
        let key = ConversationKey::group("g1");
        assert_eq!(user.last_read(&key), None);

        let at = Utc.timestamp_opt(1_660_000_000, 0).unwrap();
        user.set_last_read(key.clone(), at);
        assert_eq!(user.last_read(&key), Some(at));

        // Same id, different directness: distinct entry.
        assert_eq!(user.last_read(&ConversationKey::direct("g1")), None);
    }

    #[test]
    fn in_space_defaults_to_false() {
        let user = test_user();
        let key = ConversationKey::direct("u9");
        assert!(!user.is_in_space(&key));

        user.set_in_space(key.clone(), true);
        assert!(user.is_in_space(&key));

        user.set_in_space(key.clone(), false);
        assert!(!user.is_in_space(&key));
    }

    #[test]
    fn caches_survive_concurrent_mutation() {
        let user = Arc::new(test_user());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let user = Arc::clone(&user);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let key = ConversationKey::group(format!("g{}", i % 10));
                    let at = Utc.timestamp_opt(1_600_000_000 + worker * 1000 + i, 0).unwrap();
                    user.set_last_read(key.clone(), at);
                    user.set_in_space(key.clone(), i % 2 == 0);
                    let _ = user.last_read(&key);
                    let _ = user.is_in_space(&key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..10 {
            assert!(user.last_read(&ConversationKey::group(format!("g{i}"))).is_some());
        }
    }

    #[test]
    fn client_requires_token() {
        let mut user = test_user();
        assert!(user.client().is_none());

        user.auth_token = Some(String::new());
        assert!(user.client().is_none());

        user.auth_token = Some("tok".to_string());
        assert!(user.client().is_some());
    }
}
