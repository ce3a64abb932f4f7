//! Storage Layer
//!
//! Handles JSON config persistence. Rule documents are owned by
//! `services::rules::store`.

pub mod config;

pub use config::*;
