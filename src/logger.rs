//! Logging setup: console output via `env_logger`, plus a size-capped
//! session record appended to a file under the config directory.

use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;

use crate::config::ConfigManager;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Initialize logging.
///
/// Console verbosity follows `RUST_LOG` (`error`, `warn`, `info` (the
/// default), `debug`, `trace`, `off`). Each session start is also
/// recorded in the file at [`ConfigManager::log_file_path`], which is
/// rotated to `.log.old` once it outgrows 10MB.
pub fn init_logger() -> Result<()> {
    ConfigManager::ensure_config_dir()?;

    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok(); // already-initialized is fine (tests)

    rotate_if_oversized()?;
    record_session_start(level)
}

fn rotate_if_oversized() -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    if log_path.exists() && std::fs::metadata(&log_path)?.len() > MAX_LOG_SIZE {
        let rotated = log_path.with_extension("log.old");
        std::fs::rename(&log_path, &rotated)
            .with_context(|| format!("Failed to rotate log file: {}", log_path.display()))?;
    }
    Ok(())
}

fn record_session_start(level: LevelFilter) -> Result<()> {
    let log_path = ConfigManager::log_file_path()?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;
    writeln!(
        file,
        "[{}] Session started, console level {level}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    )?;
    Ok(())
}
