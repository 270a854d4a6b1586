//! User configuration stored at `~/.aiterate/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory under the home directory holding config and session records.
pub const STATE_DIR_NAME: &str = ".aiterate";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiterateConfig {
    /// Chat model used for every completion.
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    pub temperature: f32,

    /// Upper bound on test-run cycles per session.
    pub max_iterations: u32,

    /// Deadline for a single completion request, in seconds.
    pub completion_timeout_secs: u64,

    /// Deadline for a single test run, in seconds.
    pub test_timeout_secs: u64,

    /// Deadline for workspace setup and dependency commands, in seconds.
    pub setup_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    /// Where session records are kept. Defaults to `~/.aiterate`.
    pub storage_dir: Option<PathBuf>,

    /// Parent directory for generated output directories.
    pub output_root: PathBuf,
}

impl Default for AiterateConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            max_iterations: 5,
            completion_timeout_secs: 120,
            test_timeout_secs: 5 * 60,
            setup_timeout_secs: 10 * 60,
            output_limit_bytes: 100_000,
            storage_dir: None,
            output_root: PathBuf::from("."),
        }
    }
}

impl AiterateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("base_url must be non-empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("temperature must be within 0.0..=2.0"));
        }
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.completion_timeout_secs == 0 {
            return Err(anyhow!("completion_timeout_secs must be > 0"));
        }
        if self.test_timeout_secs == 0 {
            return Err(anyhow!("test_timeout_secs must be > 0"));
        }
        if self.setup_timeout_secs == 0 {
            return Err(anyhow!("setup_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_secs(self.setup_timeout_secs)
    }

    /// Resolve the session storage directory, defaulting to `~/.aiterate`.
    pub fn resolve_storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_state_dir(),
        }
    }
}

/// `~/.aiterate`.
pub fn default_state_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(STATE_DIR_NAME))
}

/// `~/.aiterate/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_state_dir()?.join(CONFIG_FILE_NAME))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AiterateConfig::default()`.
pub fn load_config(path: &Path) -> Result<AiterateConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = AiterateConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AiterateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AiterateConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    crate::io::fsutil::write_atomic(path, &buf)
}
