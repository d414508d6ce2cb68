//! File-backed tracing for a short-lived process.
//!
//! Every hook invocation is its own process appending to the same file, so
//! the file is rolled over to `hookrelay.log.1` once it grows past
//! [`MAX_LOG_BYTES`]. Nothing is ever written to stdout or stderr: the hook
//! shares its terminal with the automation tool.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";
const LOG_FILE: &str = "hookrelay.log";
const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

const FILTER_VAR: &str = "HOOKRELAY_LOG_FILTER";
const FORMAT_VAR: &str = "HOOKRELAY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("pretty") => Self::Pretty,
            _ => Self::Json,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `HOOKRELAY_LOG_FILTER`, then `RUST_LOG`, then the default. Invalid
    /// directives fall through to the next source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = [FILTER_VAR, EnvFilter::DEFAULT_ENV]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|value| EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = LogFormat::parse(lookup(FORMAT_VAR).as_deref());
        Self { filter, format }
    }
}

pub struct LoggingHandle {
    pub run_id: String,
    pub guard: WorkerGuard,
}

/// Logging for the `hook` command. Any failure leaves the process without a
/// subscriber instead of failing the hook.
pub fn init_hook_logging(data_dir: &Path) -> Option<LoggingHandle> {
    init_logging(data_dir).ok()
}

/// Install the subscriber writing to `<data_dir>/logs/hookrelay.log`.
pub fn init_logging(data_dir: &Path) -> anyhow::Result<LoggingHandle> {
    let settings = LogSettings::from_env();
    let log_dir = crate::paths::log_dir(data_dir);
    std::fs::create_dir_all(&log_dir)?;
    let rolled = roll_if_oversized(&log_dir, MAX_LOG_BYTES)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, LOG_FILE));

    let json = (settings.format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_writer(writer.clone())
            .json()
            .flatten_event(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
    });
    let pretty = (settings.format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .pretty()
            .with_file(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&settings.filter)?)
        .with(json)
        .with(pretty)
        .try_init()?;

    let run_id = run_id();
    tracing::debug!(
        component = "logging",
        event = "logging.initialized",
        log_path = %log_dir.join(LOG_FILE).display(),
        format = settings.format.as_str(),
        filter = %settings.filter,
        rolled_over = rolled.is_some(),
        run_id = %run_id,
    );

    Ok(LoggingHandle { run_id, guard })
}

fn run_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("pid-{}-{}", std::process::id(), millis)
}

/// Move an oversized log aside, replacing any earlier rollover. Returns the
/// rolled path when a move happened.
fn roll_if_oversized(log_dir: &Path, max_bytes: u64) -> std::io::Result<Option<PathBuf>> {
    let current = log_dir.join(LOG_FILE);
    let len = match std::fs::metadata(&current) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if len <= max_bytes {
        return Ok(None);
    }
    let rolled = log_dir.join(format!("{LOG_FILE}.1"));
    std::fs::rename(&current, &rolled)?;
    Ok(Some(rolled))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_json_and_info() {
        assert_eq!(
            settings(&[]),
            LogSettings {
                filter: DEFAULT_FILTER.to_string(),
                format: LogFormat::Json,
            }
        );
    }

    #[test]
    fn relay_filter_wins_over_rust_log() {
        let s = settings(&[(FILTER_VAR, "debug"), ("RUST_LOG", "trace")]);
        assert_eq!(s.filter, "debug");

        let s = settings(&[("RUST_LOG", "hookrelay=trace")]);
        assert_eq!(s.filter, "hookrelay=trace");
    }

    #[test]
    fn invalid_filter_falls_through() {
        let s = settings(&[(FILTER_VAR, "[[nope"), ("RUST_LOG", "warn")]);
        assert_eq!(s.filter, "warn");
    }

    #[test]
    fn pretty_format_is_case_insensitive() {
        assert_eq!(settings(&[(FORMAT_VAR, " Pretty ")]).format, LogFormat::Pretty);
        assert_eq!(settings(&[(FORMAT_VAR, "xml")]).format, LogFormat::Json);
    }

    #[test]
    fn oversized_log_is_rolled_over() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let current = dir.path().join(LOG_FILE);

        assert_eq!(roll_if_oversized(dir.path(), 16).expect("roll"), None);

        std::fs::write(&current, "small").expect("write");
        assert_eq!(roll_if_oversized(dir.path(), 16).expect("roll"), None);
        assert!(current.exists());

        std::fs::write(&current, "x".repeat(64)).expect("write");
        let rolled = roll_if_oversized(dir.path(), 16)
            .expect("roll")
            .expect("rolled over");
        assert_eq!(rolled, dir.path().join("hookrelay.log.1"));
        assert!(!current.exists());
        assert_eq!(std::fs::read_to_string(&rolled).expect("read").len(), 64);
    }
}
