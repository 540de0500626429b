//! GroupMe client error types.

use thiserror::Error;

use super::types::GroupMeId;

/// Result type for GroupMe operations.
pub type GroupMeResult<T> = Result<T, GroupMeError>;

/// Errors that can occur talking to the GroupMe API.
///
/// These propagate to the calling sync loop unchanged; no retries happen at
/// this layer.
#[derive(Debug, Error)]
pub enum GroupMeError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GroupMe returned an error response.
    #[error("GroupMe API error (HTTP {status}): {}", .messages.join("; "))]
    Api { status: u16, messages: Vec<String> },

    /// Removal target has no membership entry in the group.
    #[error("user {user} is not a member of group {group}")]
    NotAMember { user: GroupMeId, group: GroupMeId },

    /// Failed to decode a response body.
    #[error("failed to decode GroupMe response: {0}")]
    Parse(String),
}
