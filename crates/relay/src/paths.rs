//! Central path resolution for hookrelay data files.
//!
//! Resolved once per invocation from: CLI `--data-dir` > `HOOKRELAY_DATA_DIR` env >
//! the platform data directory (`~/.local/share/hookrelay` on Linux).
//! All callsites use these helpers instead of constructing paths by hand.

use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "hookrelay";

/// Resolve the data directory.
///
/// Priority: `explicit` arg > `HOOKRELAY_DATA_DIR` env > platform default.
pub fn resolve_data_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    choose_data_dir(explicit, std::env::var("HOOKRELAY_DATA_DIR").ok())
}

fn choose_data_dir(explicit: Option<&Path>, env_val: Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Some(v) = env_val.filter(|v| !v.trim().is_empty()) {
        return Ok(PathBuf::from(v));
    }
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .map(|base| base.join(APP_DIR))
        .ok_or_else(|| anyhow::anyhow!("could not determine a data directory; pass --data-dir"))
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("threads.db")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// `~/.config/hookrelay/config.toml` (platform equivalent elsewhere).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Claude Code user settings, where hook commands are registered.
pub fn claude_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("settings.json"))
}

/// Create all required subdirectories under the data dir.
pub fn ensure_dirs(data_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(log_dir(data_dir))?;
    Ok(())
}
