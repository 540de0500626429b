//! Bridge user repository.
//!
//! Storage faults here are logged and swallowed: the store stays available
//! and callers receive an absent or empty result. The bridge keeps its
//! in-memory state authoritative until a later write succeeds, so none of
//! these operations return errors.

use anyhow::{Context, Result};
use ruma::{OwnedRoomId, RoomId, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{error, instrument, warn};

use super::models::User;
use crate::groupme::GroupMeId;

const USER_COLUMNS: &str = "mxid, gmid, auth_token, management_room, space_room";

/// Repository for bridge user records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch every bridge user. An empty table yields an empty vec; a query
    /// fault is logged and also yields an empty vec so bridge startup can
    /// proceed.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Vec<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users");
        let rows = match sqlx::query(&query).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(err) => {
                error!("Failed to fetch bridge users: {err}");
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| match user_from_row(row) {
                Ok(user) => Some(user),
                Err(err) => {
                    error!("Dropping undecodable users row: {err:#}");
                    None
                }
            })
            .collect()
    }

    /// Look up a user by Matrix id. Absent row yields `None`; a fault is
    /// logged and yields `None`.
    #[instrument(skip(self))]
    pub async fn get_by_mxid(&self, mxid: &UserId) -> Option<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE mxid = ?");
        let row = sqlx::query(&query)
            .bind(mxid.as_str())
            .fetch_optional(&self.pool)
            .await;
        self.decode(row)
    }

    /// Look up a user by GroupMe id. The argument is canonicalized before it
    /// is used as a query key.
    #[instrument(skip(self))]
    pub async fn get_by_gmid(&self, gmid: &GroupMeId) -> Option<User> {
        let gmid = gmid.canonical();
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE gmid = ?");
        let row = sqlx::query(&query)
            .bind(gmid.as_str())
            .fetch_optional(&self.pool)
            .await;
        self.decode(row)
    }

    /// Persist a new user. A constraint violation or I/O fault is logged and
    /// swallowed; a duplicate insert is recoverable, not a crash.
    #[instrument(skip(self, user), fields(mxid = %user.mxid))]
    pub async fn insert(&self, user: &User) {
        let result = sqlx::query(
            "INSERT INTO users (mxid, gmid, auth_token, management_room, space_room) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.mxid.as_str())
        .bind(user.canonical_gmid().map(|gmid| gmid.0))
        .bind(stored_token(user))
        .bind(user.management_room.as_ref().map(|room| room.as_str()))
        .bind(user.space_room.as_ref().map(|room| room.as_str()))
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            warn!("Failed to insert {}: {err}", user.mxid);
        }
    }

    /// Persist mutated credential and room references, keyed by `mxid`. Same
    /// non-fatal failure policy as [`Self::insert`].
    #[instrument(skip(self, user), fields(mxid = %user.mxid))]
    pub async fn update(&self, user: &User) {
        let result = sqlx::query(
            "UPDATE users SET gmid = ?, auth_token = ?, management_room = ?, space_room = ? \
             WHERE mxid = ?",
        )
        .bind(user.canonical_gmid().map(|gmid| gmid.0))
        .bind(stored_token(user))
        .bind(user.management_room.as_ref().map(|room| room.as_str()))
        .bind(user.space_room.as_ref().map(|room| room.as_str()))
        .bind(user.mxid.as_str())
        .execute(&self.pool)
        .await;

        if let Err(err) = result {
            warn!("Failed to update {}: {err}", user.mxid);
        }
    }

    fn decode(&self, row: Result<Option<SqliteRow>, sqlx::Error>) -> Option<User> {
        match row {
            Ok(Some(row)) => match user_from_row(&row) {
                Ok(user) => Some(user),
                Err(err) => {
                    error!("Failed to decode users row: {err:#}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                error!("Failed to fetch bridge user: {err}");
                None
            }
        }
    }
}

fn stored_token(user: &User) -> Option<&str> {
    user.auth_token.as_deref().filter(|token| !token.is_empty())
}

/// Decode a users row. NULL gmid and auth_token map to absent, not errors;
/// an unparseable Matrix identifier is a genuine decode fault.
fn user_from_row(row: &SqliteRow) -> Result<User> {
    let mxid: String = row.try_get("mxid")?;
    let mxid = UserId::parse(&mxid).with_context(|| format!("invalid mxid in users row: {mxid}"))?;

    let mut user = User::new(mxid);

    let gmid: Option<String> = row.try_get("gmid")?;
    user.gmid = gmid.filter(|gmid| !gmid.is_empty()).map(GroupMeId::from);

    let token: Option<String> = row.try_get("auth_token")?;
    user.auth_token = token.filter(|token| !token.is_empty());

    user.management_room = room_ref(row.try_get("management_room")?)?;
    user.space_room = room_ref(row.try_get("space_room")?)?;

    Ok(user)
}

fn room_ref(value: Option<String>) -> Result<Option<OwnedRoomId>> {
    value
        .filter(|room| !room.is_empty())
        .map(|room| {
            RoomId::parse(&room).with_context(|| format!("invalid room id in users row: {room}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use ruma::RoomId;

    async fn setup() -> UserRepository {
        let db = Database::in_memory().await.unwrap();
        UserRepository::new(db.pool().clone())
    }

    fn user(mxid: &str) -> User {
        User::new(UserId::parse(mxid).unwrap())
    }

    #[tokio::test]
    async fn get_all_on_empty_table_returns_empty_vec() {
        let repo = setup().await;
        assert!(repo.get_all().await.is_empty());
    }

    #[tokio::test]
    async fn insert_persists_canonical_gmid() {
        let repo = setup().await;

        let mut record = user("@alice:example.org");
        record.gmid = Some(GroupMeId::from("12345@proxy01"));
        record.auth_token = Some("tok".to_string());
        repo.insert(&record).await;

        let found = repo.get_by_gmid(&GroupMeId::from("12345")).await.unwrap();
        assert_eq!(found.mxid, record.mxid);
        assert_eq!(found.gmid, Some(GroupMeId::from("12345")));
        assert_eq!(found.auth_token.as_deref(), Some("tok"));

        // Composite lookups canonicalize too.
        assert!(repo.get_by_gmid(&GroupMeId::from("12345@other")).await.is_some());
    }

    #[tokio::test]
    async fn update_reflects_on_next_read() {
        let repo = setup().await;

        let mut record = user("@bob:example.org");
        repo.insert(&record).await;

        record.gmid = Some(GroupMeId::from("777"));
        record.auth_token = Some("new-token".to_string());
        record.management_room = Some(RoomId::parse("!admin:example.org").unwrap());
        record.space_room = Some(RoomId::parse("!space:example.org").unwrap());
        repo.update(&record).await;

        let found = repo.get_by_mxid(&record.mxid).await.unwrap();
        assert_eq!(found.gmid, Some(GroupMeId::from("777")));
        assert_eq!(found.auth_token.as_deref(), Some("new-token"));
        assert_eq!(found.management_room, record.management_room);
        assert_eq!(found.space_room, record.space_room);
    }

    #[tokio::test]
    async fn unlinked_user_round_trips_as_absent_fields() {
        let repo = setup().await;

        repo.insert(&user("@carol:example.org")).await;

        let mxid = UserId::parse("@carol:example.org").unwrap();
        let found = repo.get_by_mxid(&mxid).await.unwrap();
        assert!(found.gmid.is_none());
        assert!(found.auth_token.is_none());
        assert!(found.management_room.is_none());
        assert!(found.space_room.is_none());
    }

    #[tokio::test]
    async fn absent_row_is_not_an_error() {
        let repo = setup().await;
        let mxid = UserId::parse("@nobody:example.org").unwrap();
        assert!(repo.get_by_mxid(&mxid).await.is_none());
        assert!(repo.get_by_gmid(&GroupMeId::from("404")).await.is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_swallowed() {
        let repo = setup().await;

        let mut first = user("@dave:example.org");
        first.auth_token = Some("original".to_string());
        repo.insert(&first).await;

        let mut second = user("@dave:example.org");
        second.auth_token = Some("clobber".to_string());
        repo.insert(&second).await;

        // First write wins; the duplicate is logged and dropped.
        let found = repo.get_by_mxid(&first.mxid).await.unwrap();
        assert_eq!(found.auth_token.as_deref(), Some("original"));
        assert_eq!(repo.get_all().await.len(), 1);
    }

    #[tokio::test]
    async fn get_all_returns_every_record() {
        let repo = setup().await;

        let mut linked = user("@erin:example.org");
        linked.gmid = Some(GroupMeId::from("999@gm"));
        repo.insert(&linked).await;
        repo.insert(&user("@frank:example.org")).await;

        let all = repo.get_all().await;
        assert_eq!(all.len(), 2);
        let erin = all.iter().find(|u| u.mxid == linked.mxid).unwrap();
        assert_eq!(erin.gmid, Some(GroupMeId::from("999")));
    }
}
