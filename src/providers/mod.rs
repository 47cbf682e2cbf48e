//! External service gateways.
//!
//! This module contains the gateway traits and implementations for external
//! services:
//!
//! - [`email`] - Mail service gateways (Gmail API)

pub mod email;
