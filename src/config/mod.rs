// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, normalize_batch_size, normalize_batch_timeout,
    BatchConfig, LogFormat, LoggingConfig, PipelineConfig,
};
pub use validation::validate_config;
