//! Gmail API gateway implementation.
//!
//! This module provides a [`Mailbox`] implementation using the Gmail REST
//! API. It handles OAuth 2.0 token refresh, listing and fetching unread
//! messages, clearing the unread label, and sending raw messages.
//!
//! # Authentication
//!
//! Gmail uses OAuth 2.0. Each account's credential record carries a client
//! id/secret and a long-lived refresh token; an access token is obtained by
//! refresh-token exchange before the account's cycle runs.
//!
//! # API Usage
//!
//! This gateway uses the Gmail API v1:
//! - `users.messages.list` with `q=is:unread` for unread references
//! - `users.messages.get` for complete messages
//! - `users.messages.modify` to remove the `UNREAD` label
//! - `users.messages.send` for forwarded messages

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{Mailbox, ProviderError, Result};
use crate::domain::{AccountId, Header, Message, MessageId, Payload};
use crate::storage::GmailCredentials;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
    #[allow(dead_code)]
    next_page_token: Option<String>,
    #[allow(dead_code)]
    result_size_estimate: Option<u32>,
}

/// Reference entry in a message list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRef {
    id: String,
    #[allow(dead_code)]
    thread_id: Option<String>,
}

/// Gmail API message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    payload: Option<GmailPayload>,
    #[allow(dead_code)]
    snippet: Option<String>,
}

/// Gmail message payload (headers and body parts).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPayload {
    mime_type: Option<String>,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

/// Gmail message header.
#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

/// Gmail message part (for multipart messages).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    mime_type: Option<String>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
    #[allow(dead_code)]
    filename: Option<String>,
}

/// Gmail message body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailBody {
    data: Option<String>,
    #[allow(dead_code)]
    size: Option<u32>,
}

/// Gmail modify request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    remove_label_ids: Vec<String>,
}

/// Gmail send request body.
#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

/// Gmail send response.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: u64,
    #[allow(dead_code)]
    token_type: String,
}

/// Gmail API gateway.
///
/// Implements [`Mailbox`] against the Gmail REST API with OAuth 2.0
/// refresh-token authentication. One instance serves one account for the
/// duration of a scheduler tick.
///
/// # Example
///
/// ```ignore
/// use inbox_relay::providers::email::{GmailMailbox, Mailbox};
///
/// let mut mailbox = GmailMailbox::new(account_id, credentials, timeout)?;
/// mailbox.authenticate().await?;
///
/// let unread = mailbox.list_unread().await?;
/// ```
pub struct GmailMailbox {
    /// Account this gateway serves.
    account_id: AccountId,
    /// HTTP client for API requests, with a per-request timeout.
    client: reqwest::Client,
    /// OAuth credentials for this account.
    credentials: GmailCredentials,
    /// Current OAuth access token, set by [`authenticate`](Self::authenticate).
    access_token: Option<String>,
}

impl GmailMailbox {
    /// Creates a gateway for one account.
    ///
    /// The gateway cannot make API calls until
    /// [`authenticate`](Self::authenticate) succeeds.
    pub fn new(
        account_id: AccountId,
        credentials: GmailCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Internal(format!("build http client: {}", e)))?;

        Ok(Self {
            account_id,
            client,
            credentials,
            access_token: None,
        })
    }

    /// Returns the account this gateway serves.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Exchanges the stored refresh token for an access token.
    pub async fn authenticate(&mut self) -> Result<()> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        self.access_token = Some(token_response.access_token);
        tracing::debug!(account_id = %self.account_id, "access token refreshed");
        Ok(())
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", GMAIL_API_BASE, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Makes an authenticated POST request to the Gmail API.
    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", GMAIL_API_BASE, endpoint);
        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Makes an authenticated POST request that doesn't return a body.
    async fn post_no_response<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", GMAIL_API_BASE, endpoint);
        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }
        Ok(())
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            400 => ProviderError::InvalidRequest(body),
            401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited {
                retry_after_secs: None,
            },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }
}

/// Converts a Gmail API message to the domain message type.
///
/// Header order and name casing are preserved exactly as delivered.
fn to_domain_message(msg: GmailMessage) -> Message {
    let (headers, payload) = match msg.payload {
        Some(p) => {
            let headers = p
                .headers
                .unwrap_or_default()
                .into_iter()
                .map(|h| Header::new(h.name, h.value))
                .collect();
            let payload = Payload {
                mime_type: p.mime_type.unwrap_or_default(),
                data: p.body.and_then(|b| b.data),
                parts: p
                    .parts
                    .unwrap_or_default()
                    .into_iter()
                    .map(to_domain_payload)
                    .collect(),
            };
            (headers, payload)
        }
        None => (Vec::new(), Payload::default()),
    };

    Message {
        id: MessageId(msg.id),
        headers,
        payload,
    }
}

fn to_domain_payload(part: GmailPart) -> Payload {
    Payload {
        mime_type: part.mime_type.unwrap_or_default(),
        data: part.body.and_then(|b| b.data),
        parts: part
            .parts
            .unwrap_or_default()
            .into_iter()
            .map(to_domain_payload)
            .collect(),
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_unread(&self) -> Result<Vec<MessageId>> {
        let response: MessageListResponse = self.get("/messages?q=is:unread").await?;

        Ok(response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId(m.id))
            .collect())
    }

    async fn get_message(&self, id: &MessageId) -> Result<Message> {
        let endpoint = format!("/messages/{}?format=full", id);
        let msg: GmailMessage = self.get(&endpoint).await?;
        Ok(to_domain_message(msg))
    }

    async fn mark_read(&self, id: &MessageId) -> Result<()> {
        let endpoint = format!("/messages/{}/modify", id);
        let body = ModifyRequest {
            add_label_ids: vec![],
            remove_label_ids: vec!["UNREAD".to_string()],
        };
        self.post_no_response(&endpoint, &body).await
    }

    async fn send(&self, raw: &str) -> Result<()> {
        let response: SendResponse = self
            .post(
                "/messages/send",
                &SendRequest {
                    raw: raw.to_string(),
                },
            )
            .await?;

        tracing::info!(
            account_id = %self.account_id,
            message_id = %response.id,
            "message sent via Gmail API"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> GmailCredentials {
        GmailCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    #[test]
    fn gateway_creation() {
        let mailbox = GmailMailbox::new(
            AccountId::from("test-account"),
            test_credentials(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(mailbox.account_id().0, "test-account");
    }

    #[test]
    fn unauthenticated_gateway_has_no_auth_headers() {
        let mailbox = GmailMailbox::new(
            AccountId::from("test-account"),
            test_credentials(),
            Duration::from_secs(30),
        )
        .unwrap();
        assert!(matches!(
            mailbox.auth_headers(),
            Err(ProviderError::Authentication(_))
        ));
    }

    #[test]
    fn message_list_without_entries_parses_empty() {
        let response: MessageListResponse =
            serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(response.messages.is_none());
    }

    #[test]
    fn message_list_parses_references() {
        let response: MessageListResponse = serde_json::from_str(
            r#"{"messages": [{"id": "m1", "threadId": "t1"}, {"id": "m2", "threadId": "t2"}]}"#,
        )
        .unwrap();
        let ids: Vec<String> = response
            .messages
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn gmail_message_converts_to_domain() {
        let json = r#"{
            "id": "m1",
            "snippet": "preview",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "To", "value": "someone@example.com"},
                    {"name": "Subject", "value": "Hello"}
                ],
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": "aGVsbG8", "size": 5}},
                    {"mimeType": "text/html", "body": {"data": "PGI-aGk8L2I-", "size": 11}}
                ]
            }
        }"#;
        let msg: GmailMessage = serde_json::from_str(json).unwrap();
        let message = to_domain_message(msg);

        assert_eq!(message.id, MessageId::from("m1"));
        assert_eq!(message.header("To"), Some("someone@example.com"));
        assert_eq!(message.header("Subject"), Some("Hello"));
        assert_eq!(message.payload.mime_type, "multipart/alternative");
        assert_eq!(message.payload.parts.len(), 2);
        assert_eq!(message.payload.extract("text/plain"), "hello");
    }

    #[test]
    fn nested_parts_convert_recursively() {
        let json = r#"{
            "id": "m2",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [],
                "parts": [
                    {
                        "mimeType": "multipart/alternative",
                        "parts": [
                            {"mimeType": "text/plain", "body": {"data": "aW5uZXI"}}
                        ]
                    }
                ]
            }
        }"#;
        let msg: GmailMessage = serde_json::from_str(json).unwrap();
        let message = to_domain_message(msg);

        assert_eq!(message.payload.parts[0].parts.len(), 1);
        assert_eq!(message.payload.extract("text/plain"), "inner");
    }

    #[test]
    fn message_without_payload_converts_to_empty() {
        let msg: GmailMessage = serde_json::from_str(r#"{"id": "m3"}"#).unwrap();
        let message = to_domain_message(msg);

        assert!(message.headers.is_empty());
        assert_eq!(message.payload.extract("text/plain"), "");
    }

    #[test]
    fn modify_request_omits_empty_label_lists() {
        let body = ModifyRequest {
            add_label_ids: vec![],
            remove_label_ids: vec!["UNREAD".to_string()],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"removeLabelIds":["UNREAD"]}"#);
    }
}
