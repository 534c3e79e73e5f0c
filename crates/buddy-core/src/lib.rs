//! # buddy-core
//!
//! Core types, traits, configuration, and error handling for the Buddy bot.

pub mod completion;
pub mod config;
pub mod error;
pub mod message;
pub mod traits;
