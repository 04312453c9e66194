// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of pipeline configuration values.
//!
//! Tokio's bounded channels refuse a capacity of zero, so both the stage
//! channel and the error channel must hold at least one item. Batch values
//! are not checked here: zero means "use the default" for both of them.

use crate::config::PipelineConfig;
use crate::errors::ConfigError;

/// Validate a loaded configuration, reporting the first invalid field.
pub fn validate_config(cfg: &PipelineConfig) -> Result<(), ConfigError> {
    if cfg.get_channel_capacity() == 0 {
        return Err(ConfigError::InvalidValue {
            field: "channel_capacity",
            reason: "must be at least 1".to_string(),
        });
    }

    if cfg.get_error_buffer() == 0 {
        return Err(ConfigError::InvalidValue {
            field: "error_buffer",
            reason: "must be at least 1".to_string(),
        });
    }

    if let Some(level) = &cfg.logging.level {
        if level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level",
                reason: "must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_error_buffer_is_rejected() {
        let cfg = PipelineConfig {
            error_buffer: Some(0),
            ..Default::default()
        };
        match validate_config(&cfg) {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "error_buffer"),
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_log_level_is_rejected() {
        let cfg = PipelineConfig {
            logging: LoggingConfig {
                level: Some("  ".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(validate_config(&cfg).is_err());
    }
}
