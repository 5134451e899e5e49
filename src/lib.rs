//! Two-party WebSocket signaling relay: one sender, one receiver.

pub mod config;
pub mod signaling;
