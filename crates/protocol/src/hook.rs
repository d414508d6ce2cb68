//! Hook payloads written to stdin by the automation tool

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Lifecycle event a hook invocation was registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    SubagentStop,
    UserPromptSubmit,
    PreCompact,
    SessionStart,
    SessionEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::PreToolUse,
        EventKind::PostToolUse,
        EventKind::Notification,
        EventKind::Stop,
        EventKind::SubagentStop,
        EventKind::UserPromptSubmit,
        EventKind::PreCompact,
        EventKind::SessionStart,
        EventKind::SessionEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::Notification => "Notification",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::PreCompact => "PreCompact",
            Self::SessionStart => "SessionStart",
            Self::SessionEnd => "SessionEnd",
        }
    }

    /// Boundary events are delivered to both the session thread and the
    /// main channel.
    pub fn is_boundary(self) -> bool {
        matches!(self, Self::Stop | Self::Notification)
    }

    /// The event that ends a session and archives its thread.
    pub fn is_termination(self) -> bool {
        self == Self::Stop
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an event name matches no known hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hook event '{0}'")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    /// Accepts `PreToolUse`, `pre-tool-use` and `pre_tool_use`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// JSON document a hook receives on stdin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_hook_active: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HookInput {
    /// Event kind named by the payload itself, if recognizable.
    pub fn event_kind(&self) -> Option<EventKind> {
        self.hook_event_name.as_deref()?.parse().ok()
    }

    /// String field from `tool_input`, e.g. `command` or `file_path`.
    pub fn tool_input_str(&self, key: &str) -> Option<&str> {
        self.tool_input.as_ref()?.get(key)?.as_str()
    }
}
