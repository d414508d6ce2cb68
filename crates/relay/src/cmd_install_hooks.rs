//! `hookrelay install-hooks`: register hookrelay with Claude Code.
//!
//! Safely merges one `hookrelay hook <Event>` entry per event into
//! `~/.claude/settings.json`, replacing earlier hookrelay entries in place.

use std::path::{Path, PathBuf};

use hookrelay_protocol::EventKind;
use serde_json::{json, Value};

use crate::paths;

const MARKER: &str = "hookrelay";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<EventKind>,
    pub updated: Vec<EventKind>,
}

pub fn run(settings_path: Option<&Path>) -> anyhow::Result<()> {
    let settings_file = match settings_path {
        Some(path) => path.to_path_buf(),
        None => paths::claude_settings_path()
            .ok_or_else(|| anyhow::anyhow!("HOME not found; pass --settings"))?,
    };
    let binary = hook_binary();

    // Read existing settings or start with empty object
    let mut settings = if settings_file.exists() {
        let content = std::fs::read_to_string(&settings_file)?;
        serde_json::from_str::<Value>(&content)?
    } else {
        json!({})
    };

    let report = merge_hooks(&mut settings, &binary)?;

    if settings_file.exists() {
        let backup = settings_file.with_extension("json.bak");
        std::fs::copy(&settings_file, &backup)?;
        println!(
            "  Backed up {} → {}",
            settings_file.display(),
            backup.display()
        );
    }
    if let Some(parent) = settings_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&settings_file, serde_json::to_string_pretty(&settings)?)?;

    println!();
    if !report.added.is_empty() {
        println!("  Added {} hook(s):", report.added.len());
        for kind in &report.added {
            println!("    + hooks.{kind}");
        }
    }
    if !report.updated.is_empty() {
        println!("  Updated {} hook(s):", report.updated.len());
        for kind in &report.updated {
            println!("    ~ hooks.{kind}");
        }
    }
    println!();
    println!("  Settings written to {}", settings_file.display());
    println!();

    Ok(())
}

/// Absolute path of the running binary when known, so hooks keep working
/// without `hookrelay` on Claude Code's PATH.
fn hook_binary() -> String {
    std::env::current_exe()
        .ok()
        .map(|p: PathBuf| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| MARKER.to_string())
}

/// Add or replace the hookrelay entry for every event under `hooks`.
pub fn merge_hooks(settings: &mut Value, binary: &str) -> anyhow::Result<MergeReport> {
    let obj = settings
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("settings.json is not a JSON object"))?;
    let hooks_map = obj
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("settings.json 'hooks' is not an object"))?;

    let mut report = MergeReport::default();
    for kind in EventKind::ALL {
        // Claude Code hook format: each array entry wraps hooks in a `hooks` array
        let mut entry = json!({
            "hooks": [{
                "type": "command",
                "command": format!("{binary} hook {kind}"),
            }]
        });
        if matches!(kind, EventKind::PreToolUse | EventKind::PostToolUse) {
            entry["matcher"] = json!("*");
        }

        match hooks_map.get_mut(kind.as_str()).and_then(Value::as_array_mut) {
            Some(entries) => match entries.iter().position(is_relay_entry) {
                Some(idx) => {
                    entries[idx] = entry;
                    report.updated.push(kind);
                }
                None => {
                    entries.push(entry);
                    report.added.push(kind);
                }
            },
            None => {
                hooks_map.insert(kind.as_str().to_string(), json!([entry]));
                report.added.push(kind);
            }
        }
    }
    Ok(report)
}

fn is_relay_entry(entry: &Value) -> bool {
    let is_relay_command = |value: &Value| {
        value
            .get("command")
            .and_then(Value::as_str)
            .is_some_and(|c| c.contains(MARKER))
    };
    match entry.get("hooks").and_then(Value::as_array) {
        Some(hooks) => hooks.iter().any(is_relay_command),
        None => is_relay_command(entry),
    }
}
