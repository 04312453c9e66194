// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced on the pipeline's shared error channel.
//!
//! None of these stop the stage that produced them. The stage reports the
//! failure and moves on to the next item.

use thiserror::Error;

/// Per-item runtime failure reported by a pipeline stage.
#[derive(Error, Debug)]
pub enum StageError {
    /// The subscription's blocking receive returned a terminal error.
    #[error("subscription receive failed: {0}")]
    Subscription(#[source] anyhow::Error),

    /// The caller's map function rejected an item.
    #[error("map step failed: {0}")]
    Map(#[source] anyhow::Error),

    /// A value that is not a list reached the reduce step.
    #[error("cannot reduce data that isn't a list")]
    NonListValue,

    /// The caller's reduce function failed while folding a batch.
    #[error("reduce step failed at index {index}: {source}")]
    Reduce {
        index: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Returned by [`MessageSink::deliver`](crate::traits::MessageSink::deliver)
/// once the pipeline stopped accepting messages.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pipeline no longer accepts messages")]
pub struct SinkClosed;

impl StageError {
    /// Short label used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::Subscription(_) => "receiver",
            StageError::Map(_) => "mapper",
            StageError::NonListValue | StageError::Reduce { .. } => "reducer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            StageError::NonListValue.to_string(),
            "cannot reduce data that isn't a list"
        );
        assert_eq!(
            StageError::Map(anyhow::anyhow!("bad item")).to_string(),
            "map step failed: bad item"
        );
        let err = StageError::Reduce {
            index: 3,
            source: anyhow::anyhow!("overflow"),
        };
        assert_eq!(err.to_string(), "reduce step failed at index 3: overflow");
        assert_eq!(err.stage(), "reducer");
    }
}
