// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod publish;
mod stage;
pub mod tagged;

pub use config::ConfigError;
pub use publish::PublishError;
pub use stage::{SinkClosed, StageError};
pub use tagged::{code_of, kind_of, Error, ErrorCode, ErrorKind};
