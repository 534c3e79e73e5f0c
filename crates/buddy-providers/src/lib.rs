//! # buddy-providers
//!
//! Chat-completion provider implementations for Buddy.

pub mod openai;
