// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failure to publish one message. The publisher client collects one of
/// these per failed input instead of stopping at the first failure.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize message {index}: {source}")]
    Serialize {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to publish message {index}: {source}")]
    Publish {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl PublishError {
    /// Position of the failed message in the published input.
    pub fn index(&self) -> usize {
        match self {
            PublishError::Serialize { index, .. } | PublishError::Publish { index, .. } => *index,
        }
    }
}
