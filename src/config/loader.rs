// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_BATCH_SIZE, DEFAULT_BATCH_TIMEOUT_MS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_ERROR_BUFFER,
    DEFAULT_LOG_LEVEL,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration for a subscriber pipeline.
///
/// Every field is optional; unset values fall back to the constants in
/// [`consts`](crate::config::consts). The struct is typically loaded from a
/// YAML or TOML file next to the service.
///
/// # Fields
/// * `channel_capacity` - Buffer between two consecutive stages
/// * `error_buffer` - Buffer of the shared error channel; errors beyond it are dropped and counted
/// * `batch` - Defaults applied to batch steps built from configuration
/// * `logging` - Log filter and output format
///
/// # Example
/// ```yaml
/// channel_capacity: 1
/// error_buffer: 64
/// batch:
///   size: 100
///   timeout_ms: 500
/// logging:
///   level: debug
///   format: compact
/// ```
#[derive(Debug, Deserialize, Default, Clone)]
pub struct PipelineConfig {
    pub channel_capacity: Option<usize>,
    pub error_buffer: Option<usize>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    pub fn get_channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn get_error_buffer(&self) -> usize {
        self.error_buffer.unwrap_or(DEFAULT_ERROR_BUFFER)
    }
}

/// Size and deadline of a batch step.
///
/// A size of zero and a timeout of zero are treated as "unset", matching how
/// the batch builder normalizes its arguments.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BatchConfig {
    pub size: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl BatchConfig {
    pub fn get_size(&self) -> usize {
        normalize_batch_size(self.size.unwrap_or(0))
    }

    pub fn get_timeout(&self) -> Duration {
        normalize_batch_timeout(Duration::from_millis(self.timeout_ms.unwrap_or(0)))
    }
}

/// Replace a zero batch size with [`DEFAULT_BATCH_SIZE`].
pub fn normalize_batch_size(size: usize) -> usize {
    if size == 0 {
        DEFAULT_BATCH_SIZE
    } else {
        size
    }
}

/// Replace a zero flush timeout with [`DEFAULT_BATCH_TIMEOUT_MS`].
pub fn normalize_batch_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        Duration::from_millis(DEFAULT_BATCH_TIMEOUT_MS)
    } else {
        timeout
    }
}

/// Log output settings.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `subpipe=debug`. `RUST_LOG` overrides it.
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn get_level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Output format of the fmt subscriber.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Load a config from a YAML or TOML file, chosen by extension
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a config file and reject values the pipeline cannot run with.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg)?;
    Ok(cfg)
}
