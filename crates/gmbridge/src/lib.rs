//! Identity and history synchronization core for a GroupMe to Matrix bridge.
//!
//! The crate owns three things: the durable mapping between a Matrix user and
//! their GroupMe identity ([`user::UserRepository`]), the per-user in-memory
//! sync caches ([`user::User`]), and the paginated GroupMe history client
//! ([`groupme::GroupMeClient`]). Portal and room bridging logic lives above
//! this crate and decides when to sync; real-time push is handled by a
//! separate listener.

pub mod config;
pub mod db;
pub mod groupme;
pub mod user;
