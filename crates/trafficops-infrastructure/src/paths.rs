//! Unified path management for trafficops configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/trafficops/        # Config directory (or $TRAFFICOPS_CONFIG_DIR)
//! ├── config.toml              # Client configuration
//! ├── secret.json              # API token
//! └── logs/                    # CLI logs
//!     └── trafficops.log.YYYY-MM-DD
//! ```

use std::env;
use std::path::{Path, PathBuf};
use trafficops_core::error::{Result, TrafficOpsError};

/// Environment variable that relocates the whole config directory.
pub const CONFIG_DIR_ENV: &str = "TRAFFICOPS_CONFIG_DIR";

const APP_DIR_NAME: &str = "trafficops";

/// Resolves trafficops file locations.
///
/// An explicit base path wins over `TRAFFICOPS_CONFIG_DIR`, which wins over
/// the platform config directory.
#[derive(Debug, Clone, Default)]
pub struct TrafficOpsPaths {
    base_path: Option<PathBuf>,
}

impl TrafficOpsPaths {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            base_path: base_path.map(Path::to_path_buf),
        }
    }

    /// Returns the trafficops configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/trafficops/`)
    /// - `Err(TrafficOpsError::Config)`: Could not determine directory
    pub fn config_dir(&self) -> Result<PathBuf> {
        resolve_config_dir(
            self.base_path.as_deref(),
            env::var_os(CONFIG_DIR_ENV).map(PathBuf::from),
        )
    }

    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("logs"))
    }
}

fn resolve_config_dir(base_path: Option<&Path>, env_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(base) = base_path {
        return Ok(base.to_path_buf());
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| TrafficOpsError::config("Cannot find home directory"))
}
