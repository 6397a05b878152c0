use anyhow::{Context, Result};
use std::path::PathBuf;

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/reqtrace or ~/.config/reqtrace
    /// - macOS: ~/Library/Application Support/reqtrace
    /// - Windows: %APPDATA%\reqtrace
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            // Follow XDG Base Directory Specification
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join("reqtrace"))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join("reqtrace"))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home
                .join("Library")
                .join("Application Support")
                .join("reqtrace"))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join("reqtrace"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(".reqtrace"))
        }
    }

    /// Primary token store path (preferred location).
    pub fn token_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("auth-token"))
    }

    /// Legacy token store path, kept readable so tokens written by older
    /// versions are never silently lost.
    pub fn legacy_token_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("credentials.json"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("reqtrace-vcs.log"))
    }

    /// Ensure the config directory exists, creating it if necessary
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        Ok(dir)
    }
}
