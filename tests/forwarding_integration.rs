//! Integration tests for the forwarding pipeline.
//!
//! These tests drive the full cycle (list, classify, compose, send, mark
//! read) against an in-memory mailbox fake. Each service module contains its
//! own unit tests for detailed logic testing.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;

use inbox_relay::domain::{
    AccountId, ForwardRule, Header, KeywordSet, Message, MessageId, Payload, RuleSet,
};
use inbox_relay::providers::email::{Mailbox, ProviderError};
use inbox_relay::services::ForwardService;
use inbox_relay::storage::CredentialStore;

// ============================================================================
// In-memory mailbox fake
// ============================================================================

struct StoredMessage {
    message: Message,
    unread: bool,
}

#[derive(Default)]
struct FakeState {
    messages: Vec<StoredMessage>,
    sent: Vec<String>,
    fail_listing: bool,
}

/// Mailbox backed by in-memory state, tracking sends and read markers.
#[derive(Default)]
struct FakeMailbox {
    state: Mutex<FakeState>,
}

impl FakeMailbox {
    fn with_messages(messages: Vec<Message>) -> Self {
        let state = FakeState {
            messages: messages
                .into_iter()
                .map(|message| StoredMessage {
                    message,
                    unread: true,
                })
                .collect(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn failing() -> Self {
        Self {
            state: Mutex::new(FakeState {
                fail_listing: true,
                ..Default::default()
            }),
        }
    }

    fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    fn unread_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.unread)
            .count()
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn list_unread(&self) -> Result<Vec<MessageId>, ProviderError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(ProviderError::Connection("listing refused".to_string()));
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| m.unread)
            .map(|m| m.message.id.clone())
            .collect())
    }

    async fn get_message(&self, id: &MessageId) -> Result<Message, ProviderError> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .iter()
            .find(|m| &m.message.id == id)
            .map(|m| m.message.clone())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    async fn mark_read(&self, id: &MessageId) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        match state.messages.iter_mut().find(|m| &m.message.id == id) {
            Some(stored) => {
                stored.unread = false;
                Ok(())
            }
            None => Err(ProviderError::NotFound(id.to_string())),
        }
    }

    async fn send(&self, raw: &str) -> Result<(), ProviderError> {
        self.state.lock().unwrap().sent.push(raw.to_string());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn encode(text: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(text.as_bytes())
}

fn decode(raw: &str) -> String {
    String::from_utf8(BASE64_URL_SAFE_NO_PAD.decode(raw).unwrap()).unwrap()
}

fn service() -> ForwardService {
    let rules = RuleSet::new(vec![
        ForwardRule {
            source: "steven.fredericks.dev110@gmail.com".to_string(),
            destination: "kevinrowland.dev0110@gmail.com".to_string(),
        },
        ForwardRule {
            source: "ghinavanry@gmail.com".to_string(),
            destination: "kevinrowland.pro0110@gmail.com".to_string(),
        },
    ])
    .unwrap();
    let keywords = KeywordSet::new(vec![
        "verification code".to_string(),
        "verify your email address".to_string(),
    ]);
    ForwardService::new(
        rules,
        keywords,
        CredentialStore::new("/tmp/unused-tokens"),
        Duration::from_secs(5),
    )
}

fn plain_message(id: &str, to: &str, subject: &str, body: &str) -> Message {
    Message {
        id: MessageId::from(id),
        headers: vec![Header::new("To", to), Header::new("Subject", subject)],
        payload: Payload::leaf("text/plain", encode(body)),
    }
}

// ============================================================================
// Pipeline scenarios
// ============================================================================

#[tokio::test]
async fn matched_message_is_forwarded_and_marked_read() {
    let mailbox = FakeMailbox::with_messages(vec![plain_message(
        "m1",
        "steven.fredericks.dev110@gmail.com",
        "Your verification code",
        "code: 1234",
    )]);

    let report = service().run_cycle(&mailbox).await.unwrap();

    assert_eq!(report.forwarded, 1);
    assert!(report.is_clean());

    let sent = mailbox.sent();
    assert_eq!(sent.len(), 1);

    let decoded = decode(&sent[0]);
    assert!(decoded.contains("From: steven.fredericks.dev110@gmail.com"));
    assert!(decoded.contains("To: kevinrowland.dev0110@gmail.com"));
    assert!(decoded.contains("Subject: Fwd: Your verification code"));
    assert!(decoded.contains("Content-Type: text/plain; charset=UTF-8"));
    assert!(decoded.ends_with("code: 1234"));

    assert_eq!(mailbox.unread_count(), 0);
}

#[tokio::test]
async fn rerunning_the_cycle_produces_no_duplicate_send() {
    let mailbox = FakeMailbox::with_messages(vec![plain_message(
        "m1",
        "steven.fredericks.dev110@gmail.com",
        "Your verification code",
        "code: 1234",
    )]);

    let svc = service();
    let first = svc.run_cycle(&mailbox).await.unwrap();
    assert_eq!(first.forwarded, 1);

    let second = svc.run_cycle(&mailbox).await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(second.forwarded, 0);
    assert_eq!(mailbox.sent().len(), 1);
}

#[tokio::test]
async fn matching_recipient_with_unmatched_subject_is_left_alone() {
    let mailbox = FakeMailbox::with_messages(vec![plain_message(
        "m1",
        "steven.fredericks.dev110@gmail.com",
        "Lunch on Friday?",
        "see you there",
    )]);

    let report = service().run_cycle(&mailbox).await.unwrap();

    assert_eq!(report.forwarded, 0);
    assert_eq!(report.skipped, 1);
    assert!(mailbox.sent().is_empty());
    assert_eq!(mailbox.unread_count(), 1);
}

#[tokio::test]
async fn recipient_matching_ignores_case() {
    let mailbox = FakeMailbox::with_messages(vec![plain_message(
        "m1",
        "Ghinavanry@gmail.com",
        "Please VERIFY your email address now",
        "click the link",
    )]);

    let report = service().run_cycle(&mailbox).await.unwrap();

    assert_eq!(report.forwarded, 1);
    let decoded = decode(&mailbox.sent()[0]);
    assert!(decoded.contains("To: kevinrowland.pro0110@gmail.com"));
}

#[tokio::test]
async fn multipart_alternative_forwards_the_html_variant() {
    let payload = Payload::container(
        "multipart/alternative",
        vec![
            Payload::leaf("text/plain", encode("plain body")),
            Payload::leaf("text/html", encode("<p>html body</p>")),
        ],
    );
    let mailbox = FakeMailbox::with_messages(vec![Message {
        id: MessageId::from("m1"),
        headers: vec![
            Header::new("To", "steven.fredericks.dev110@gmail.com"),
            Header::new("Subject", "Your verification code"),
        ],
        payload,
    }]);

    service().run_cycle(&mailbox).await.unwrap();

    let decoded = decode(&mailbox.sent()[0]);
    assert!(decoded.contains("Content-Type: text/html; charset=UTF-8"));
    assert!(decoded.ends_with("<p>html body</p>"));
}

#[tokio::test]
async fn message_without_subject_is_skipped_but_cycle_continues() {
    let no_subject = Message {
        id: MessageId::from("m1"),
        headers: vec![Header::new("To", "steven.fredericks.dev110@gmail.com")],
        payload: Payload::leaf("text/plain", encode("orphan")),
    };
    let mailbox = FakeMailbox::with_messages(vec![
        no_subject,
        plain_message(
            "m2",
            "steven.fredericks.dev110@gmail.com",
            "Your verification code",
            "code: 5678",
        ),
    ]);

    let report = service().run_cycle(&mailbox).await.unwrap();

    assert_eq!(report.forwarded, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(mailbox.sent().len(), 1);
}

#[tokio::test]
async fn failing_account_does_not_block_the_rest_of_the_tick() {
    let broken = FakeMailbox::failing();
    let healthy = FakeMailbox::with_messages(vec![plain_message(
        "m1",
        "steven.fredericks.dev110@gmail.com",
        "Your verification code",
        "code: 1234",
    )]);

    let report = service()
        .run_accounts(vec![
            (AccountId::from("broken"), Box::new(broken)),
            (AccountId::from("healthy"), Box::new(healthy)),
        ])
        .await;

    assert_eq!(report.accounts_failed, 1);
    assert_eq!(report.accounts_processed, 1);
    assert_eq!(report.forwarded, 1);
}
