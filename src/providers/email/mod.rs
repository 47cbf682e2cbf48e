//! Mail gateway implementations.
//!
//! This module contains the [`Mailbox`] trait and its production
//! implementation:
//!
//! - [`GmailMailbox`] - Gmail REST API with OAuth 2.0
//!
//! # Architecture
//!
//! The gateway abstraction keeps the forwarding core independent of the
//! concrete mail service. A gateway handles:
//!
//! - Authentication (refresh-token exchange)
//! - Listing and fetching unread messages
//! - Clearing the unread marker
//! - Sending transport-encoded messages
//!
//! # Example
//!
//! ```ignore
//! use inbox_relay::providers::email::{GmailMailbox, Mailbox};
//!
//! async fn scan(mailbox: &dyn Mailbox) {
//!     let unread = mailbox.list_unread().await.expect("failed to list unread");
//!     for id in unread {
//!         let message = mailbox.get_message(&id).await.expect("failed to fetch");
//!         println!("{}: {:?}", id, message.header("Subject"));
//!     }
//! }
//! ```

mod gmail;
mod traits;

pub use gmail::GmailMailbox;
pub use traits::{Mailbox, ProviderError, Result};

#[cfg(test)]
pub use traits::MockMailbox;
