//! # buddy-channels
//!
//! Messaging platform integrations for Buddy.

pub mod telegram;
