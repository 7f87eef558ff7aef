//! Configuration management (TOML)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Stop on our own after this many cycles. Unset means run until signalled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
    pub status_line: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub system_window_ms: u64,
    pub settle_window_ms: u64,
    pub poll_slice_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub threshold_percent: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            max_cycles: None,
            status_line: true,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            system_window_ms: 1250,
            settle_window_ms: 250,
            poll_slice_ms: 25,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            threshold_percent: 25.0,
        }
    }
}

impl SamplingConfig {
    pub fn system_window(&self) -> Duration {
        Duration::from_millis(self.system_window_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.poll_slice_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.throttle.threshold_percent;
        if !(threshold > 0.0 && threshold <= 100.0) {
            bail!("threshold_percent must be in (0, 100], got {}", threshold);
        }
        if self.sampling.poll_slice_ms == 0 {
            bail!("poll_slice_ms must be positive");
        }
        if self.sampling.system_window_ms == 0 || self.sampling.settle_window_ms == 0 {
            bail!("sampling windows must be positive");
        }
        Ok(())
    }

    pub fn config_path() -> std::path::PathBuf {
        directories::ProjectDirs::from("", "", "loadguard")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| std::path::PathBuf::from("config.toml"))
    }
}
