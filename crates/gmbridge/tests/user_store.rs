//! Persistence round-trips through an on-disk database.

use ruma::{RoomId, UserId};
use tempfile::TempDir;

use gmbridge::db::Database;
use gmbridge::groupme::GroupMeId;
use gmbridge::user::{User, UserRepository};

#[tokio::test]
async fn records_survive_reopening_the_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.db");

    let mxid = UserId::parse("@alice:example.org").unwrap();
    {
        let db = Database::new(&path).await.unwrap();
        let repo = UserRepository::new(db.pool().clone());

        let mut user = User::new(mxid.clone());
        user.gmid = Some(GroupMeId::from("12345@proxy01"));
        user.auth_token = Some("tok".to_string());
        user.management_room = Some(RoomId::parse("!mgmt:example.org").unwrap());
        repo.insert(&user).await;
    }

    // Reopen: migrations are idempotent and the row is still there, with the
    // canonical gmid.
    let db = Database::new(&path).await.unwrap();
    let repo = UserRepository::new(db.pool().clone());

    let found = repo.get_by_gmid(&GroupMeId::from("12345")).await;
    let found = match found {
        Some(found) => found,
        None => panic!("record not found after reopen"),
    };
    assert_eq!(found.mxid, mxid);
    assert_eq!(found.gmid, Some(GroupMeId::from("12345")));
    assert_eq!(found.auth_token.as_deref(), Some("tok"));
    assert_eq!(
        found.management_room.as_deref().map(|room| room.as_str()),
        Some("!mgmt:example.org")
    );
    assert!(found.space_room.is_none());

    // Caches never persist: a fresh load starts empty.
    assert!(found.last_read(&gmbridge::user::ConversationKey::group("g1")).is_none());
}

#[tokio::test]
async fn startup_with_no_users_yields_empty_listing() {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("bridge.db")).await.unwrap();
    let repo = UserRepository::new(db.pool().clone());

    assert!(repo.get_all().await.is_empty());
}
