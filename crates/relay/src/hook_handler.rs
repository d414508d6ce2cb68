//! `hookrelay hook [EVENT]`: handle one hook invocation.
//!
//! Reads the hook's JSON from stdin, applies the event filter, formats the
//! message and hands it to the delivery pipeline. Nothing here may fail the
//! automation tool: every problem is logged and the process still exits 0.

use std::path::Path;
use std::sync::Arc;

use hookrelay_protocol::{EventKind, HookInput};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::delivery::DeliveryPipeline;
use crate::discord::DiscordClient;
use crate::formatting::format_event;
use crate::resolver::ThreadResolver;
use crate::thread_store::ThreadStore;

/// Entry point for the `hook` subcommand.
pub async fn run(event_arg: Option<&str>, config_path: Option<&Path>, data_dir: &Path) {
    let mut raw = String::new();
    if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
        warn!(
            component = "hook",
            event = "hook.stdin_failed",
            error = %e,
            "Failed to read hook input"
        );
        return;
    }

    let input = match parse_input(&raw) {
        Ok(input) => input,
        Err(e) => {
            warn!(
                component = "hook",
                event = "hook.invalid_input",
                error = %e,
                bytes = raw.len(),
                "Hook input is not valid JSON"
            );
            return;
        }
    };

    let Some(kind) = event_kind(event_arg, &input) else {
        warn!(
            component = "hook",
            event = "hook.unknown_event",
            event_arg = ?event_arg,
            hook_event_name = ?input.hook_event_name,
            "Could not determine hook event"
        );
        return;
    };

    let config = match RelayConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                component = "hook",
                event = "hook.config_invalid",
                error = %e,
                "Configuration error; nothing delivered"
            );
            return;
        }
    };

    handle(&input, kind, Arc::new(config), data_dir).await;
}

pub fn parse_input(raw: &str) -> serde_json::Result<HookInput> {
    if raw.trim().is_empty() {
        return Ok(HookInput::default());
    }
    serde_json::from_str(raw)
}

/// The CLI argument wins; otherwise the payload names its own event.
pub fn event_kind(event_arg: Option<&str>, input: &HookInput) -> Option<EventKind> {
    match event_arg {
        Some(arg) => arg.parse().ok(),
        None => input.event_kind(),
    }
}

/// Format and deliver one event. Returns whether anything was delivered.
pub async fn handle(
    input: &HookInput,
    kind: EventKind,
    config: Arc<RelayConfig>,
    data_dir: &Path,
) -> bool {
    if !config.has_webhook() && !config.has_bot() {
        debug!(
            component = "hook",
            event = "hook.unconfigured",
            "No Discord credentials configured"
        );
        return false;
    }
    if !config.events.allows(kind) {
        debug!(
            component = "hook",
            event = "hook.filtered",
            hook_event = %kind,
        );
        return false;
    }

    let client = match DiscordClient::new(&config.discord) {
        Ok(client) => client,
        Err(e) => {
            warn!(
                component = "hook",
                event = "hook.client_failed",
                error = %e,
            );
            return false;
        }
    };

    let payload = format_event(input, kind, &config.discord);
    let store = open_store(&config, data_dir);
    let resolver = ThreadResolver::new(config.clone(), client, store);
    let mut pipeline = DeliveryPipeline::new(config, resolver);

    let delivered = pipeline.deliver(&payload, &input.session_id, kind).await;
    info!(
        component = "hook",
        event = "hook.handled",
        hook_event = %kind,
        session_id = %input.session_id,
        delivered,
    );
    delivered
}

/// Open the thread store when threading is on. An unusable store is logged
/// and skipped; resolution then relies on Discord alone.
pub fn open_store(config: &RelayConfig, data_dir: &Path) -> Option<ThreadStore> {
    if !config.threads_enabled() {
        return None;
    }
    let path = config.store_path(data_dir);
    match ThreadStore::open(&path, config.threads.cleanup_days) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(
                component = "hook",
                event = "hook.store_unavailable",
                path = %path.display(),
                error = %e,
                "Thread store unavailable; continuing without it"
            );
            None
        }
    }
}
