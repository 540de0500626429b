//! Bridge user identity records and persistence.

mod models;
mod repository;

pub use models::{ConversationKey, User};
pub use repository::UserRepository;
