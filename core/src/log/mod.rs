//! Logging bootstrap for hosts embedding the manga core.
//!
//! Daily log files go under the configured log directory and warnings also reach stderr.
//! [`init`] installs the global subscriber once; later calls return the first handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

use crate::config::CoreConfig;

const ENV_FILTER_VARS: [&str; 2] = ["MANGA_CORE_LOG", "RUST_LOG"];
const FILE_PREFIX: &str = "manga-core";

static LOG_HANDLE: OnceLock<LogHandle> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub directory: PathBuf,
    /// Daily files kept when pruning at startup; `0` keeps all of them.
    pub retention: usize,
    pub console_level: LevelFilter,
    /// Directive such as `manga_core::source=debug`. Unset means the environment decides.
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn from_core(config: &CoreConfig) -> Self {
        let console_level =
            if cfg!(debug_assertions) { LevelFilter::INFO } else { LevelFilter::WARN };
        Self { directory: config.log_dir(), retention: 14, console_level, env_filter: None }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_core(&CoreConfig::default())
    }
}

/// Keeps the non-blocking file writer alive for the life of the process.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = LOG_HANDLE.get() {
        return Ok(handle);
    }
    let handle = install(config)?;
    Ok(LOG_HANDLE.get_or_init(|| handle))
}

fn directive(config: &LogConfig) -> String {
    config
        .env_filter
        .clone()
        .into_iter()
        .chain(ENV_FILTER_VARS.iter().filter_map(|var| std::env::var(var).ok()))
        .find(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string())
}

fn install(config: LogConfig) -> Result<LogHandle> {
    // Records from crates still on the `log` facade; another logger may already own it.
    let _ = tracing_log::LogTracer::init();

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory at {}", config.directory.display()))?;
    if config.retention > 0 {
        prune(&config.directory, config.retention).context("pruning old log files")?;
    }

    let appender = rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(FILE_PREFIX)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating daily log appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(directive(&config)).context("parsing log filter directive")?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true);
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(config.console_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(LogHandle { _guard: guard, directory: config.directory })
}

/// Delete all but the `keep` most recently modified `manga-core*` files in `dir`.
fn prune(dir: &Path, keep: usize) -> Result<()> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(FILE_PREFIX) {
            continue;
        }
        let meta = entry.metadata()?;
        if meta.is_file() {
            logs.push((meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), entry.path()));
        }
    }

    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(keep) {
        let _ = fs::remove_file(path);
    }
    Ok(())
}
