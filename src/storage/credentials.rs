//! File-backed credential records.
//!
//! Each configured account has one JSON credential record in a tokens
//! directory; the file stem is the account identifier. Records are read
//! fresh at the start of every scheduler tick, so a record dropped into the
//! directory is picked up without a restart.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::AccountId;

/// Errors that can occur while reading credential records.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The tokens directory itself cannot be read.
    #[error("credential directory {dir} is not readable: {source}")]
    DirUnreadable {
        /// Directory that failed to enumerate.
        dir: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// An individual record cannot be read.
    #[error("credential record for {account} is not readable: {source}")]
    RecordUnreadable {
        /// Account whose record failed.
        account: AccountId,
        /// Underlying IO error.
        source: io::Error,
    },

    /// An individual record is not valid JSON for the expected shape.
    #[error("credential record for {account} is invalid: {source}")]
    RecordInvalid {
        /// Account whose record failed.
        account: AccountId,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Result type for credential store operations.
pub type Result<T> = std::result::Result<T, CredentialError>;

/// OAuth credential record for one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailCredentials {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// OAuth refresh token.
    pub refresh_token: String,
}

/// A directory of per-account credential records.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Creates a store over the given tokens directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory this store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enumerates the account identifiers present in the store.
    ///
    /// Only `.json` entries are considered; identifiers are the file stems,
    /// returned in sorted order so ticks process accounts deterministically.
    ///
    /// # Errors
    ///
    /// Fails when the directory itself cannot be enumerated. Individual
    /// records are not opened here; a corrupt record surfaces later from
    /// [`load`](Self::load).
    pub fn accounts(&self) -> Result<Vec<AccountId>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CredentialError::DirUnreadable {
            dir: self.dir.clone(),
            source,
        })?;

        let mut accounts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CredentialError::DirUnreadable {
                dir: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                accounts.push(AccountId::from(stem));
            }
        }

        accounts.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(accounts)
    }

    /// Loads the credential record for an account.
    pub fn load(&self, account: &AccountId) -> Result<GmailCredentials> {
        let path = self.dir.join(format!("{}.json", account));
        let contents =
            fs::read_to_string(&path).map_err(|source| CredentialError::RecordUnreadable {
                account: account.clone(),
                source,
            })?;

        serde_json::from_str(&contents).map_err(|source| CredentialError::RecordInvalid {
            account: account.clone(),
            source,
        })
    }
}
