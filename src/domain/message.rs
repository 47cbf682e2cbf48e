//! Message domain types.
//!
//! Represents a fetched mail message: the ordered header list exactly as
//! delivered by the mail service, plus the root payload node.

use serde::{Deserialize, Serialize};

use super::{MessageId, Payload};

/// A single message header as delivered by the mail service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name, case preserved as delivered.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header from a name/value pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fetched mail message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Identifier the message was fetched under.
    pub id: MessageId,
    /// Ordered headers, names case-sensitive as delivered.
    pub headers: Vec<Header>,
    /// Root of the payload tree.
    pub payload: Payload,
}

impl Message {
    /// Looks up a header value by exact name.
    ///
    /// Names are matched case-sensitively against whatever the service
    /// delivered; the first occurrence wins. Returns `None` when the header
    /// is absent rather than failing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}
