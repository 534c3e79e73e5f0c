//! # buddy-memory
//!
//! Message history and system prompt storage for Buddy (SQLite-backed).

pub mod store;

pub use store::{Store, StoredMessage};
