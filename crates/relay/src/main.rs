//! hookrelay
//!
//! Forwards Claude Code hook events into Discord, grouping each session's
//! events into its own thread.

mod cmd_install_hooks;
mod cmd_status;
mod config;
mod delivery;
mod discord;
mod formatting;
mod hook_handler;
mod logging;
mod migration_runner;
mod paths;
mod resolver;
mod thread_cache;
mod thread_naming;
mod thread_store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::RelayConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "hookrelay", version = VERSION)]
#[command(about = "Forward Claude Code hook events to Discord")]
struct Cli {
    /// Config file (default: ~/.config/hookrelay/config.toml)
    #[arg(long, global = true, env = "HOOKRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the thread store and logs
    #[arg(long, global = true, env = "HOOKRELAY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one hook invocation (JSON on stdin). Always exits 0.
    Hook {
        /// Event name; defaults to the payload's hook_event_name
        event: Option<String>,
    },

    /// Show configuration and thread store statistics
    Status,

    /// Remove thread bindings unused for longer than the retention window
    Cleanup {
        /// Retention in days (default: threads.cleanup_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Register hookrelay in Claude Code's settings.json
    InstallHooks {
        /// Path to settings.json (default: ~/.claude/settings.json)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Hook { event } => {
            run_hook(event.as_deref(), &cli).await;
            Ok(())
        }
        Command::Status => {
            let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref())?;
            let config = RelayConfig::load(cli.config.as_deref())?;
            cmd_status::run(&config, &data_dir)
        }
        Command::Cleanup { days } => {
            let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref())?;
            let _logging = logging::init_logging(&data_dir)?;
            let config = RelayConfig::load(cli.config.as_deref())?;
            cmd_status::cleanup(&config, &data_dir, *days)
        }
        Command::InstallHooks { settings } => cmd_install_hooks::run(settings.as_deref()),
    }
}

/// Hook failures never reach the automation tool; without a data dir or a
/// logger the hook still runs, just unobserved.
async fn run_hook(event: Option<&str>, cli: &Cli) {
    let Ok(data_dir) = paths::resolve_data_dir(cli.data_dir.as_deref()) else {
        return;
    };
    let logging_handle = paths::ensure_dirs(&data_dir)
        .ok()
        .and_then(|_| logging::init_hook_logging(&data_dir));

    if let Some(handle) = &logging_handle {
        tracing::debug!(
            component = "hook",
            event = "hook.started",
            run_id = %handle.run_id,
            event_arg = ?event,
        );
    }

    hook_handler::run(event, cli.config.as_deref(), &data_dir).await;
}
