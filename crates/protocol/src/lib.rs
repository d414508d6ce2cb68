//! hookrelay protocol
//!
//! Shared types for the hook relay: the JSON documents hooks receive on
//! stdin and the Discord REST payloads sent on their behalf.

pub mod discord;
pub mod hook;

pub use discord::*;
pub use hook::{EventKind, HookInput, UnknownEvent};
