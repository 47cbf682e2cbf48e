//! Credential storage.
//!
//! This module provides the persistence layer for the daemon: per-account
//! OAuth credential records read from a tokens directory.

mod credentials;

pub use credentials::{CredentialError, CredentialStore, GmailCredentials};
