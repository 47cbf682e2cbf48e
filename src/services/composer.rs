//! Forwarded-message composition.
//!
//! Builds the outbound copy of a matched message: picks a body out of the
//! original's payload tree, prefixes the subject, and serializes the result
//! into the transport encoding the gateway expects.

use base64::prelude::*;
use thiserror::Error;

use crate::domain::{ForwardRule, Message, Payload};

/// Errors that can occur while composing a forward.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The original message carries no Subject header.
    #[error("original message has no Subject header")]
    MissingSubject,
}

/// Content kind of a selected body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `text/html` body.
    Html,
    /// `text/plain` body.
    Plain,
}

impl BodyKind {
    /// MIME type label for this kind.
    pub fn mime_type(self) -> &'static str {
        match self {
            BodyKind::Html => "text/html",
            BodyKind::Plain => "text/plain",
        }
    }
}

/// A composed outbound copy of a matched message.
#[derive(Debug, Clone)]
pub struct ForwardedMessage {
    /// Sender: the matched source identity.
    pub from: String,
    /// Recipient: the rule's destination address.
    pub to: String,
    /// Original subject with a `Fwd:` prefix.
    pub subject: String,
    /// Content kind of the selected body.
    pub kind: BodyKind,
    /// Selected body text.
    pub body: String,
}

impl ForwardedMessage {
    /// Serializes the message and encodes it for the transport.
    ///
    /// The wire form is a minimal header block (`From`, `To`, `Subject`,
    /// `Content-Type` with UTF-8 charset), a blank separator line, and the
    /// body, encoded as URL-safe base64 without padding.
    pub fn to_raw(&self) -> String {
        let message = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: {}; charset=UTF-8\r\n\r\n{}",
            self.from,
            self.to,
            self.subject,
            self.kind.mime_type(),
            self.body
        );
        BASE64_URL_SAFE_NO_PAD.encode(message.as_bytes())
    }
}

/// Composes the forwarded copy of a matched message.
///
/// The sender is the rule's source identity, the recipient its destination.
/// A message without a Subject header is a recoverable [`ComposeError`];
/// the caller skips the message rather than aborting the cycle.
pub fn compose(message: &Message, rule: &ForwardRule) -> Result<ForwardedMessage, ComposeError> {
    let subject = message
        .header("Subject")
        .ok_or(ComposeError::MissingSubject)?;

    let (body, kind) = select_body(&message.payload);

    Ok(ForwardedMessage {
        from: rule.source.clone(),
        to: rule.destination.clone(),
        subject: format!("Fwd: {}", subject),
        kind,
        body,
    })
}

/// Picks the body text (and its kind) out of a payload tree.
///
/// HTML and alternative roots yield their HTML rendition; plain-text roots
/// yield their own data; any other root with children is searched for HTML
/// first, falling back to plain text. Anything else yields an empty body.
///
/// The declared kind follows the body actually selected rather than being
/// pinned to HTML, so plain-text originals are forwarded as plain text.
fn select_body(payload: &Payload) -> (String, BodyKind) {
    match payload.mime_type.as_str() {
        "text/html" | "multipart/alternative" => {
            let body = if !payload.parts.is_empty() {
                extract_parts(payload, "text/html")
            } else {
                payload.decoded_data().unwrap_or_default()
            };
            (body, BodyKind::Html)
        }
        "text/plain" => (payload.decoded_data().unwrap_or_default(), BodyKind::Plain),
        _ if !payload.parts.is_empty() => {
            let html = extract_parts(payload, "text/html");
            if html.is_empty() {
                (extract_parts(payload, "text/plain"), BodyKind::Plain)
            } else {
                (html, BodyKind::Html)
            }
        }
        _ => (String::new(), BodyKind::Html),
    }
}

/// Extracts the requested type from the payload's children, in order.
fn extract_parts(payload: &Payload, mime_type: &str) -> String {
    payload
        .parts
        .iter()
        .map(|part| part.extract(mime_type))
        .collect()
}
