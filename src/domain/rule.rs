//! Forwarding rule types and matching.
//!
//! A rule set maps source identities to destination addresses; a keyword set
//! holds subject trigger phrases. Both are built once from configuration and
//! shared read-only for the life of the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a rule set from configuration.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Two rules name the same source identity.
    #[error("duplicate rule source: {0}")]
    DuplicateSource(String),

    /// A rule has an empty source identity.
    #[error("rule source must not be empty")]
    EmptySource,

    /// A rule has an empty destination address.
    #[error("rule destination for {0} must not be empty")]
    EmptyDestination(String),
}

/// A single redirection rule.
///
/// Mail whose recipient header contains the source identity is forwarded to
/// the destination address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRule {
    /// Identity to look for in the recipient header.
    #[serde(rename = "match")]
    pub source: String,
    /// Address a matched message is forwarded to.
    #[serde(rename = "forward_to")]
    pub destination: String,
}

/// An ordered, validated collection of forwarding rules.
///
/// Order is significant: when several sources are substrings of the same
/// recipient value, the first configured rule wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ForwardRule>,
}

impl RuleSet {
    /// Builds a rule set, rejecting empty fields and duplicate sources.
    ///
    /// Sources are compared case-insensitively for duplicate detection,
    /// matching how they are compared against recipients.
    pub fn new(rules: Vec<ForwardRule>) -> Result<Self, RuleError> {
        let mut seen: Vec<String> = Vec::with_capacity(rules.len());
        for rule in &rules {
            if rule.source.trim().is_empty() {
                return Err(RuleError::EmptySource);
            }
            if rule.destination.trim().is_empty() {
                return Err(RuleError::EmptyDestination(rule.source.clone()));
            }
            let folded = rule.source.to_lowercase();
            if seen.contains(&folded) {
                return Err(RuleError::DuplicateSource(rule.source.clone()));
            }
            seen.push(folded);
        }
        Ok(Self { rules })
    }

    /// Finds the first rule whose source identity appears in the recipient
    /// header value, compared case-insensitively.
    pub fn match_recipient(&self, recipient: &str) -> Option<&ForwardRule> {
        let recipient = recipient.to_lowercase();
        self.rules
            .iter()
            .find(|rule| recipient.contains(&rule.source.to_lowercase()))
    }

    /// Number of configured rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Subject trigger phrases.
///
/// A subject qualifies when its lower-cased form contains any phrase.
/// Phrases are lower-cased on construction so configuration casing does not
/// matter.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    phrases: Vec<String>,
}

impl KeywordSet {
    /// Builds a keyword set, lower-casing each phrase.
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Tests whether the subject contains any trigger phrase,
    /// case-insensitively.
    pub fn matches(&self, subject: &str) -> bool {
        let subject = subject.to_lowercase();
        self.phrases.iter().any(|phrase| subject.contains(phrase))
    }

    /// Number of configured phrases.
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Whether the set holds no phrases.
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}
