//! `hookrelay status`: show configuration and thread store health.
//! `hookrelay cleanup`: evict stale thread bindings.

use std::path::Path;

use crate::config::RelayConfig;
use crate::thread_store::{StoreStats, ThreadStore};
use crate::VERSION;

pub fn run(config: &RelayConfig, data_dir: &Path) -> anyhow::Result<()> {
    println!();
    println!("  hookrelay v{}", VERSION);
    println!("  Data dir: {}", data_dir.display());
    println!();
    println!("  Webhook: {}", configured(config.has_webhook()));
    println!(
        "  Bot: {}",
        match (&config.discord.bot_token, &config.discord.channel_id) {
            (Some(_), Some(channel)) => format!("configured (channel {channel})"),
            (Some(_), None) => "token set, channel_id missing".to_string(),
            (None, _) => "not configured".to_string(),
        }
    );
    println!(
        "  Mentions: {}",
        config
            .discord
            .mention_user_id
            .as_deref()
            .map_or("off".to_string(), |id| format!("<@{id}>"))
    );

    if config.threads_enabled() {
        println!(
            "  Threads: {} channel, prefix \"{}\"",
            config.threads.channel_type.as_str(),
            config.threads.prefix
        );
        if !config.has_thread_credentials() {
            println!("  Warning: threads are enabled but credentials for this channel type are missing");
        }
    } else {
        println!("  Threads: off");
    }

    let db_path = config.store_path(data_dir);
    if db_path.exists() {
        let store = ThreadStore::open(&db_path, config.threads.cleanup_days)?;
        let stats = store.stats()?;
        let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
        println!();
        println!("  Database: {} ({} KB)", db_path.display(), size / 1024);
        print_stats(&stats);
        if let Some(channel) = &config.discord.channel_id {
            let bound = store.find_by_channel(channel)?;
            println!("  Bound to channel {}: {}", channel, bound.len());
        }
    } else {
        println!();
        println!("  Database: not found ({})", db_path.display());
    }

    println!();
    Ok(())
}

pub fn cleanup(config: &RelayConfig, data_dir: &Path, days: Option<u32>) -> anyhow::Result<()> {
    let days = days.unwrap_or(config.threads.cleanup_days);
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }
    let db_path = config.store_path(data_dir);
    if !db_path.exists() {
        println!("  No thread store at {}", db_path.display());
        return Ok(());
    }

    let store = ThreadStore::open(&db_path, config.threads.cleanup_days)?;
    let removed = store.cleanup_stale(days)?;
    println!(
        "  Removed {} binding(s) unused for more than {} day(s)",
        removed, days
    );
    Ok(())
}

fn print_stats(stats: &StoreStats) {
    println!(
        "  Threads: {} total ({} active, {} archived) across {} channel(s)",
        stats.total, stats.active, stats.archived, stats.channels
    );
    if let (Some(oldest), Some(newest)) = (stats.oldest_last_used, stats.newest_last_used) {
        println!(
            "  Last used: {} … {}",
            oldest.format("%Y-%m-%d %H:%M"),
            newest.format("%Y-%m-%d %H:%M")
        );
    }
}

fn configured(present: bool) -> &'static str {
    if present {
        "configured"
    } else {
        "not configured"
    }
}
