//! Core domain + application logic for the greeting bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind a
//! port (trait) implemented in the adapter crate, so the greeting state
//! machine can be exercised against a fake transport.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod greeting;
pub mod logging;
pub mod messaging;
pub mod service;
pub mod state;

pub use errors::{Error, Result};
