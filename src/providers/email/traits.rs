//! Mailbox gateway trait definition.
//!
//! This module defines the [`Mailbox`] trait, the only surface through which
//! the forwarding core touches a mail service. The production implementation
//! is [`GmailMailbox`](super::GmailMailbox); tests substitute mocks or
//! in-memory fakes.

use async_trait::async_trait;

use crate::domain::{Message, MessageId};

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Trait for mail-service gateways.
///
/// These four operations are everything the forwarding cycle needs. None of
/// them is assumed idempotent by the gateway; ordering guarantees (such as
/// marking a message read only after it was sent on) are the caller's
/// responsibility.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Lists references to the account's unread messages.
    async fn list_unread(&self) -> Result<Vec<MessageId>>;

    /// Fetches a complete message by reference.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] if the message no longer exists.
    async fn get_message(&self, id: &MessageId) -> Result<Message>;

    /// Removes the unread marker from a message.
    async fn mark_read(&self, id: &MessageId) -> Result<()>;

    /// Sends a transport-encoded message from the account.
    async fn send(&self, raw: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let auth_err = ProviderError::Authentication("token expired".to_string());
        assert_eq!(auth_err.to_string(), "authentication failed: token expired");

        let rate_err = ProviderError::RateLimited {
            retry_after_secs: Some(60),
        };
        assert!(rate_err.to_string().contains("rate limit"));

        let not_found = ProviderError::NotFound("msg-123".to_string());
        assert!(not_found.to_string().contains("not found"));
    }
}
