//! Payload tree types and body extraction.
//!
//! A message body arrives from the mail service as a tree of typed parts
//! mirroring its nested multipart structure. Leaves carry base64url-encoded
//! data; containers carry child parts.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// One node of a message's payload tree.
///
/// A node is either a leaf with inline data or a container with children.
/// The service can deliver nodes with neither; extraction then contributes
/// nothing for that branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    /// MIME type label, e.g. `text/plain` or `multipart/alternative`.
    pub mime_type: String,
    /// Inline body data, base64url-encoded as delivered.
    pub data: Option<String>,
    /// Ordered child parts for multipart nodes.
    pub parts: Vec<Payload>,
}

impl Payload {
    /// Creates a leaf part carrying encoded inline data.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data.into()),
            parts: Vec::new(),
        }
    }

    /// Creates a container part holding child parts.
    pub fn container(mime_type: impl Into<String>, parts: Vec<Payload>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
            parts,
        }
    }

    /// Collects the decoded bodies of every part of the requested MIME type,
    /// depth-first, concatenated in traversal order.
    ///
    /// A part whose type matches and which carries data contributes its
    /// decoded text and is not descended into further; any other part is
    /// searched through its children. Missing or undecodable data
    /// contributes nothing. Extraction never fails.
    pub fn extract(&self, mime_type: &str) -> String {
        let mut body = String::new();
        self.collect_into(mime_type, &mut body);
        body
    }

    fn collect_into(&self, mime_type: &str, body: &mut String) {
        if self.mime_type == mime_type && self.data.is_some() {
            if let Some(text) = self.decoded_data() {
                body.push_str(&text);
            }
        } else {
            for part in &self.parts {
                part.collect_into(mime_type, body);
            }
        }
    }

    /// Decodes this node's own inline data.
    ///
    /// Returns `None` when the node has no data, the data is not valid
    /// base64url, or the decoded bytes are not UTF-8.
    pub fn decoded_data(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(data).ok()?;
        String::from_utf8(bytes).ok()
    }
}
