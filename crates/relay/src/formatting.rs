//! Hook event → Discord message.
//!
//! One embed per event: a kind-specific title and color, a tool-aware
//! description, and a footer naming the session. Boundary events also put a
//! mention in `content` so the main channel pings the configured user.

use chrono::{SecondsFormat, Utc};
use hookrelay_protocol::{
    Embed, EmbedField, EmbedFooter, EventKind, HookInput, MessagePayload, MAX_CONTENT_CHARS,
    MAX_EMBED_DESCRIPTION_CHARS, MAX_EMBED_TITLE_CHARS, MAX_FIELD_VALUE_CHARS,
};
use serde_json::Value;

use crate::config::DiscordConfig;

const COLOR_TOOL_START: u32 = 0x3498DB;
const COLOR_TOOL_OK: u32 = 0x2ECC71;
const COLOR_TOOL_FAILED: u32 = 0xE74C3C;
const COLOR_NOTIFICATION: u32 = 0xF39C12;
const COLOR_STOP: u32 = 0x95A5A6;
const COLOR_SUBAGENT: u32 = 0x9B59B6;
const COLOR_PROMPT: u32 = 0x1ABC9C;
const COLOR_COMPACT: u32 = 0x7F8C8D;
const COLOR_SESSION: u32 = 0x5865F2;

const USERNAME: &str = "Claude Code";
const ELLIPSIS: char = '…';
const SHORT_SESSION_CHARS: usize = 8;

pub fn format_event(input: &HookInput, kind: EventKind, discord: &DiscordConfig) -> MessagePayload {
    let (title, color) = title_and_color(input, kind);
    let description = describe(input, kind);

    let mut fields = Vec::new();
    if let Some(cwd) = input.cwd.as_deref().filter(|c| !c.is_empty()) {
        fields.push(EmbedField {
            name: "Project".to_string(),
            value: truncate(&format!("`{cwd}`"), MAX_FIELD_VALUE_CHARS),
            inline: true,
        });
    }
    if kind == EventKind::PostToolUse {
        if let Some(output) = input.tool_response.as_ref().and_then(response_excerpt) {
            fields.push(EmbedField {
                name: "Output".to_string(),
                value: code_block(&output, "", MAX_FIELD_VALUE_CHARS),
                inline: false,
            });
        }
    }

    let footer = (!input.session_id.is_empty()).then(|| EmbedFooter {
        text: format!("Session {}", short_session(&input.session_id)),
    });

    let embed = Embed {
        title: Some(truncate(&title, MAX_EMBED_TITLE_CHARS)),
        description: description.map(|d| truncate(&d, MAX_EMBED_DESCRIPTION_CHARS)),
        color: Some(color),
        fields,
        footer,
        timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    };

    let content = if kind.is_boundary() {
        discord.mention_user_id.as_deref().map(|user| {
            let text = format!("<@{user}> {}", headline(input, kind, &title));
            truncate(&text, MAX_CONTENT_CHARS)
        })
    } else {
        None
    };

    MessagePayload {
        content,
        embeds: vec![embed],
        username: Some(USERNAME.to_string()),
        thread_name: None,
    }
}

fn title_and_color(input: &HookInput, kind: EventKind) -> (String, u32) {
    let tool = input.tool_name.as_deref().unwrap_or("tool");
    match kind {
        EventKind::PreToolUse => (format!("Running {tool}"), COLOR_TOOL_START),
        EventKind::PostToolUse => {
            if input.tool_response.as_ref().is_some_and(response_failed) {
                (format!("{tool} failed"), COLOR_TOOL_FAILED)
            } else {
                (format!("{tool} finished"), COLOR_TOOL_OK)
            }
        }
        EventKind::Notification => ("Notification".to_string(), COLOR_NOTIFICATION),
        EventKind::Stop => ("Session stopped".to_string(), COLOR_STOP),
        EventKind::SubagentStop => ("Subagent finished".to_string(), COLOR_SUBAGENT),
        EventKind::UserPromptSubmit => ("Prompt submitted".to_string(), COLOR_PROMPT),
        EventKind::PreCompact => ("Compacting context".to_string(), COLOR_COMPACT),
        EventKind::SessionStart => ("Session started".to_string(), COLOR_SESSION),
        EventKind::SessionEnd => ("Session ended".to_string(), COLOR_SESSION),
    }
}

/// Text after the mention in the main channel.
fn headline(input: &HookInput, kind: EventKind, title: &str) -> String {
    match (kind, input.message.as_deref()) {
        (EventKind::Notification, Some(message)) if !message.trim().is_empty() => {
            message.trim().to_string()
        }
        _ => title.to_string(),
    }
}

fn describe(input: &HookInput, kind: EventKind) -> Option<String> {
    match kind {
        EventKind::PreToolUse | EventKind::PostToolUse => tool_summary(input),
        EventKind::Notification => input.message.clone(),
        EventKind::UserPromptSubmit => input
            .prompt
            .as_deref()
            .map(|p| code_block(p, "", MAX_EMBED_DESCRIPTION_CHARS)),
        EventKind::PreCompact => input
            .extra
            .get("trigger")
            .and_then(Value::as_str)
            .map(|t| format!("Trigger: {t}")),
        EventKind::SessionStart => input
            .extra
            .get("source")
            .and_then(Value::as_str)
            .map(|s| format!("Source: {s}")),
        EventKind::SessionEnd => input
            .extra
            .get("reason")
            .and_then(Value::as_str)
            .map(|r| format!("Reason: {r}")),
        EventKind::Stop | EventKind::SubagentStop => None,
    }
}

fn tool_summary(input: &HookInput) -> Option<String> {
    let tool = input.tool_name.as_deref()?;
    let field = |key: &str| input.tool_input_str(key);

    let summary = match tool {
        "Bash" => {
            let command = field("command")?;
            let block = code_block(command, "bash", MAX_EMBED_DESCRIPTION_CHARS - 200);
            match field("description") {
                Some(desc) => format!("{desc}\n{block}"),
                None => block,
            }
        }
        "Read" | "Write" | "Edit" | "MultiEdit" => format!("`{}`", field("file_path")?),
        "NotebookEdit" => format!("`{}`", field("notebook_path")?),
        "Grep" | "Glob" => {
            let pattern = field("pattern")?;
            match field("path") {
                Some(path) => format!("`{pattern}` in `{path}`"),
                None => format!("`{pattern}`"),
            }
        }
        "WebFetch" => field("url")?.to_string(),
        "WebSearch" => field("query")?.to_string(),
        "Task" => {
            let description = field("description")?;
            match field("subagent_type") {
                Some(agent) => format!("{description} ({agent})"),
                None => description.to_string(),
            }
        }
        "TodoWrite" => {
            let count = input
                .tool_input
                .as_ref()
                .and_then(|v| v.get("todos"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            format!("{count} todo item(s)")
        }
        _ => {
            let raw = input.tool_input.as_ref()?;
            let json = serde_json::to_string_pretty(raw).ok()?;
            code_block(&json, "json", MAX_EMBED_DESCRIPTION_CHARS)
        }
    };
    Some(summary)
}

fn response_failed(response: &Value) -> bool {
    response.get("is_error").and_then(Value::as_bool) == Some(true)
        || response.get("success").and_then(Value::as_bool) == Some(false)
        || response.get("interrupted").and_then(Value::as_bool) == Some(true)
}

fn response_excerpt(response: &Value) -> Option<String> {
    let text = match response {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Object(map) => ["stdout", "output", "content", "error", "stderr"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .or_else(|| serde_json::to_string(response).ok())?,
        other => other.to_string(),
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn short_session(session_id: &str) -> String {
    session_id.chars().take(SHORT_SESSION_CHARS).collect()
}

/// Cut `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Fenced block whose total length, fences included, stays within `max`.
fn code_block(text: &str, lang: &str, max: usize) -> String {
    let overhead = lang.chars().count() + 8;
    let body = truncate(&text.replace("```", "`\u{200b}``"), max.saturating_sub(overhead));
    format!("```{lang}\n{body}\n```")
}
