//! Configuration and settings management.
//!
//! This module provides the daemon settings types and loading. Settings are
//! stored in the user's config directory as JSON.

mod settings;

pub use settings::{Settings, SettingsError};
