// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the log filter: `RUST_LOG` when set, the configured level otherwise.
pub fn build_filter(cfg: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(cfg.get_level())?),
    }
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_filter(cfg)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match cfg.format {
        LogFormat::Full => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e)),
        LogFormat::Compact => builder
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e)),
    }
}
