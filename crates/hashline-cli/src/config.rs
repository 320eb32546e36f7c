//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hashline_signer::DigestAlgorithm;
use serde::Deserialize;

/// Global configuration for hashline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub signer: SignerConfig,
    pub latency: LatencyConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SignerConfig {
    pub digest: DigestAlgorithm,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub salt: Option<String>,
}

/// Simulated primitive latency, in milliseconds
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct LatencyConfig {
    pub checksum_ms: u64,
    pub digest_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let defaults = hashline_signer::Config::default();
        Self {
            worker_threads: defaults.worker_threads,
            channel_capacity: defaults.channel_capacity,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./hashline.toml (current directory)
    /// 2. ~/.config/hashline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("hashline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "hashline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Signer settings described by this file (before CLI overrides)
    pub fn signer(&self) -> hashline_signer::Config {
        hashline_signer::Config {
            digest: self.signer.digest,
            salt: self.signer.salt.clone().unwrap_or_default(),
            checksum_delay: Duration::from_millis(self.latency.checksum_ms),
            digest_delay: Duration::from_millis(self.latency.digest_ms),
            worker_threads: self.runtime.worker_threads.max(1),
            channel_capacity: self.runtime.channel_capacity.max(1),
        }
    }
}
