//! Kernel configuration and logging setup

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

use crate::error::{KernelError, KernelResult};

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// How long a write waits for a lock before failing
    pub lock_timeout_ms: u64,
    /// Closed cursors kept per transaction for reuse
    pub cursor_pool_capacity: usize,
    /// Warn when a transaction closes cursors its caller left open
    pub track_cursor_leaks: bool,
    /// trace, debug, info, warn or error
    pub log_level: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            cursor_pool_capacity: 32,
            track_cursor_leaks: true,
            log_level: "info".to_string(),
        }
    }
}

impl KernelConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file; missing fields default
    pub fn from_file(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {}", path.display(), e)))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)
                .map_err(|e| KernelError::Config(format!("{}: {}", path.display(), e))),
            Some("json") => serde_json::from_str(&text)
                .map_err(|e| KernelError::Config(format!("{}: {}", path.display(), e))),
            _ => Err(KernelError::Config(format!(
                "{}: unsupported config format",
                path.display()
            ))),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn level(&self) -> KernelResult<Level> {
        self.log_level
            .parse()
            .map_err(|_| KernelError::Config(format!("invalid log level '{}'", self.log_level)))
    }
}

/// Install a global fmt subscriber at the configured level
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(config: &KernelConfig) -> KernelResult<bool> {
    let level = config.level()?;
    Ok(tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok())
}
