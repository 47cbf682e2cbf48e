//! Forwarding service.
//!
//! One pass ("cycle") scans a single account's unread mail, classifies each
//! message against the configured rules, and forwards qualifying messages.
//! A tick runs the cycle for every account in the credential store,
//! sequentially, with per-account and per-message failure isolation.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{AccountId, KeywordSet, MessageId, RuleSet};
use crate::providers::email::{GmailMailbox, Mailbox, ProviderError};
use crate::services::composer::{compose, ComposeError};
use crate::storage::CredentialStore;

/// Errors that can occur while processing a single message.
///
/// Every variant is contained at the message boundary: the cycle logs it
/// and moves on to the next message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Fetching the message failed.
    #[error("fetch failed: {0}")]
    Fetch(ProviderError),

    /// A required header is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// Composition failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),

    /// Sending the forward failed. The original stays unread.
    #[error("send failed: {0}")]
    Send(ProviderError),

    /// The forward was sent but the original could not be marked read.
    ///
    /// The message will be reconsidered next tick, so a duplicate forward
    /// is possible.
    #[error("mark read failed after send: {0}")]
    MarkRead(ProviderError),
}

/// What happened to a single message.
enum Outcome {
    /// Forwarded and marked read.
    Forwarded,
    /// Did not match the rules; left untouched.
    Skipped,
}

/// Result of one account's cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Unread messages examined.
    pub scanned: usize,
    /// Messages forwarded and marked read.
    pub forwarded: usize,
    /// Messages that did not match the rules.
    pub skipped: usize,
    /// Per-message errors (non-fatal for the cycle).
    pub errors: Vec<String>,
}

impl CycleReport {
    /// Returns true if the cycle completed without per-message errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of one tick across all accounts.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Accounts whose cycle ran to completion.
    pub accounts_processed: usize,
    /// Accounts skipped this tick (setup, auth, or listing failure).
    pub accounts_failed: usize,
    /// Total messages forwarded across all accounts.
    pub forwarded: usize,
}

/// Service that scans mailboxes and forwards qualifying messages.
///
/// The rule and keyword sets are built once from configuration and shared
/// read-only across all accounts; accounts themselves are rebuilt from the
/// credential store on every tick.
pub struct ForwardService {
    rules: RuleSet,
    keywords: KeywordSet,
    store: CredentialStore,
    http_timeout: Duration,
}

impl ForwardService {
    /// Creates a forwarding service.
    pub fn new(
        rules: RuleSet,
        keywords: KeywordSet,
        store: CredentialStore,
        http_timeout: Duration,
    ) -> Self {
        Self {
            rules,
            keywords,
            store,
            http_timeout,
        }
    }

    /// Runs one pass over every account in the credential store.
    ///
    /// # Errors
    ///
    /// Fails only when the credential directory itself cannot be
    /// enumerated; every per-account failure is contained and counted in
    /// the report.
    pub async fn run_tick(&self) -> anyhow::Result<TickReport> {
        let account_ids = self.store.accounts()?;

        let mut accounts: Vec<(AccountId, Box<dyn Mailbox>)> = Vec::new();
        let mut setup_failures = 0;
        for account_id in account_ids {
            match self.open_mailbox(&account_id).await {
                Ok(mailbox) => accounts.push((account_id, Box::new(mailbox))),
                Err(e) => {
                    tracing::error!(
                        account_id = %account_id,
                        error = %e,
                        "account setup failed, skipping this tick"
                    );
                    setup_failures += 1;
                }
            }
        }

        let mut report = self.run_accounts(accounts).await;
        report.accounts_failed += setup_failures;
        Ok(report)
    }

    /// Loads credentials for an account and authenticates its gateway.
    async fn open_mailbox(&self, account_id: &AccountId) -> anyhow::Result<GmailMailbox> {
        let credentials = self.store.load(account_id)?;
        let mut mailbox = GmailMailbox::new(account_id.clone(), credentials, self.http_timeout)?;
        mailbox.authenticate().await?;
        Ok(mailbox)
    }

    /// Runs the cycle for each prepared account, sequentially.
    ///
    /// An account whose cycle fails (unread listing error) is counted and
    /// skipped; it does not prevent later accounts from being processed.
    pub async fn run_accounts(&self, accounts: Vec<(AccountId, Box<dyn Mailbox>)>) -> TickReport {
        let mut report = TickReport::default();

        for (account_id, mailbox) in &accounts {
            tracing::info!(account_id = %account_id, "checking account");
            match self.run_cycle(mailbox.as_ref()).await {
                Ok(cycle) => {
                    report.accounts_processed += 1;
                    report.forwarded += cycle.forwarded;
                    if !cycle.is_clean() {
                        tracing::warn!(
                            account_id = %account_id,
                            errors = cycle.errors.len(),
                            "cycle finished with message errors"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(
                        account_id = %account_id,
                        error = %e,
                        "cycle failed, skipping account until next tick"
                    );
                    report.accounts_failed += 1;
                }
            }
        }

        report
    }

    /// Scans one mailbox and forwards every qualifying unread message.
    ///
    /// # Errors
    ///
    /// Fails only when the unread listing itself fails; every per-message
    /// error is contained and recorded in the report.
    pub async fn run_cycle(&self, mailbox: &dyn Mailbox) -> Result<CycleReport, ProviderError> {
        let unread = mailbox.list_unread().await?;

        let mut report = CycleReport {
            scanned: unread.len(),
            ..Default::default()
        };

        for id in &unread {
            match self.process_message(mailbox, id).await {
                Ok(Outcome::Forwarded) => report.forwarded += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(message_id = %id, error = %e, "message failed, continuing");
                    report.errors.push(format!("{}: {}", id, e));
                }
            }
        }

        Ok(report)
    }

    /// Classifies and, when both checks pass, forwards a single message.
    ///
    /// The unread marker is cleared only after the forward was accepted by
    /// the gateway; a send failure leaves the message unread for the next
    /// tick.
    async fn process_message(
        &self,
        mailbox: &dyn Mailbox,
        id: &MessageId,
    ) -> Result<Outcome, MessageError> {
        let message = mailbox.get_message(id).await.map_err(MessageError::Fetch)?;

        let recipient = message
            .header("To")
            .ok_or(MessageError::MissingHeader("To"))?;
        let subject = message
            .header("Subject")
            .ok_or(MessageError::MissingHeader("Subject"))?;

        // Both checks are computed before deciding; neither short-circuits
        // the other.
        let rule = self.rules.match_recipient(recipient);
        let subject_qualifies = self.keywords.matches(subject);

        let rule = match rule {
            Some(rule) if subject_qualifies => rule,
            _ => return Ok(Outcome::Skipped),
        };

        let forward = compose(&message, rule)?;
        mailbox
            .send(&forward.to_raw())
            .await
            .map_err(MessageError::Send)?;

        tracing::info!(
            message_id = %id,
            source = %rule.source,
            destination = %rule.destination,
            "message forwarded"
        );

        if let Err(e) = mailbox.mark_read(id).await {
            tracing::warn!(
                message_id = %id,
                error = %e,
                "forwarded but could not mark read; may forward again next tick"
            );
            return Err(MessageError::MarkRead(e));
        }

        Ok(Outcome::Forwarded)
    }
}
