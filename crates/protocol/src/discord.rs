//! Discord REST payloads (API v10)

use serde::{Deserialize, Serialize};

/// Discord channel type for a public thread created from a text channel.
pub const PUBLIC_THREAD_TYPE: u8 = 11;

/// Maximum characters Discord accepts in message `content`.
pub const MAX_CONTENT_CHARS: usize = 2000;
pub const MAX_EMBED_TITLE_CHARS: usize = 256;
pub const MAX_EMBED_DESCRIPTION_CHARS: usize = 4096;
pub const MAX_FIELD_NAME_CHARS: usize = 256;
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;
pub const MAX_THREAD_NAME_CHARS: usize = 100;

/// Message body accepted by both the webhook and the bot message endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Webhook-only: creates a forum post with this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
}

impl MessagePayload {
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, |c| c.trim().is_empty()) && self.embeds.is_empty()
    }

    /// Copy carrying only the embeds. Falls back to the full payload when
    /// there are no embeds to send.
    pub fn embeds_only(&self) -> MessagePayload {
        if self.embeds.is_empty() {
            return self.clone();
        }
        MessagePayload {
            content: None,
            embeds: self.embeds.clone(),
            username: self.username.clone(),
            thread_name: None,
        }
    }

    /// Copy carrying only the text content (where boundary events put
    /// their mention). `None` when the content is empty.
    pub fn mention_only(&self) -> Option<MessagePayload> {
        let content = self
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())?;
        Some(MessagePayload {
            content: Some(content.to_string()),
            embeds: Vec::new(),
            username: self.username.clone(),
            thread_name: None,
        })
    }

    pub fn with_thread_name(&self, name: &str) -> MessagePayload {
        MessagePayload {
            thread_name: Some(name.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO-8601 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// Thread state flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub locked: bool,
    /// Cursor for paging archived listings (`before=`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_timestamp: Option<String>,
}

/// Thread channel as returned by the API. Never persisted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteThread {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub thread_metadata: ThreadMetadata,
}

impl RemoteThread {
    pub fn is_archived(&self) -> bool {
        self.thread_metadata.archived
    }

    pub fn is_locked(&self) -> bool {
        self.thread_metadata.locked
    }
}

/// Channel metadata subset used to reach the guild's active-thread listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Message object returned by a send (`?wait=true` for webhooks)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveThreadsPage {
    #[serde(default)]
    pub threads: Vec<RemoteThread>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchivedThreadsPage {
    #[serde(default)]
    pub threads: Vec<RemoteThread>,
    #[serde(default)]
    pub has_more: bool,
}

/// Structured error body Discord returns with most 4xx responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateThreadRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub auto_archive_duration: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadStatePatch {
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}
