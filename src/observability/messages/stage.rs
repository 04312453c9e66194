// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for stage lifecycle, batching and error events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Why a stage task returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The upstream stage closed its output.
    InputClosed,
    /// The pipeline's cancellation token fired.
    Cancelled,
    /// The downstream consumer dropped its receiver.
    OutputClosed,
    /// The subscription's receive call returned.
    SourceEnded,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let reason = match self {
            StopReason::InputClosed => "input closed",
            StopReason::Cancelled => "cancelled",
            StopReason::OutputClosed => "output closed",
            StopReason::SourceEnded => "source ended",
        };
        f.write_str(reason)
    }
}

/// What caused a batch to be flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Deadline,
    InputClosed,
}

impl Display for FlushTrigger {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let trigger = match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Deadline => "deadline",
            FlushTrigger::InputClosed => "input closed",
        };
        f.write_str(trigger)
    }
}

/// Stage task spawned.
///
/// # Log Level
/// `debug!` - Wiring detail
///
/// # Example
/// ```
/// use subpipe::observability::messages::stage::StageStarted;
///
/// let msg = StageStarted { stage: "batcher", position: 2 };
/// assert_eq!(msg.to_string(), "Stage 'batcher' started at position 2");
/// ```
pub struct StageStarted<'a> {
    pub stage: &'a str,
    pub position: usize,
}

impl Display for StageStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' started at position {}",
            self.stage, self.position
        )
    }
}

impl StructuredLog for StageStarted<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, position = self.position, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage",
            span_name = name,
            stage = self.stage,
            position = self.position,
        )
    }
}

/// Stage task returned and closed its output.
///
/// # Log Level
/// `debug!` - Shutdown cascades through every stage, one line each
pub struct StageStopped<'a> {
    pub stage: &'a str,
    pub reason: StopReason,
    pub processed: u64,
}

impl Display for StageStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' stopped ({}) after processing {} items",
            self.stage, self.reason, self.processed
        )
    }
}

impl StructuredLog for StageStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            reason = %self.reason,
            processed = self.processed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_stopped",
            span_name = name,
            stage = self.stage,
            reason = %self.reason,
        )
    }
}

/// Batch emitted downstream.
///
/// # Log Level
/// `debug!` - High-frequency event
///
/// # Example
/// ```
/// use subpipe::observability::messages::stage::{BatchFlushed, FlushTrigger};
///
/// let msg = BatchFlushed { size: 4, capacity: 5, trigger: FlushTrigger::Deadline };
/// assert_eq!(msg.to_string(), "Flushed batch of 4/5 items (trigger: deadline)");
/// ```
pub struct BatchFlushed {
    pub size: usize,
    pub capacity: usize,
    pub trigger: FlushTrigger,
}

impl Display for BatchFlushed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Flushed batch of {}/{} items (trigger: {})",
            self.size, self.capacity, self.trigger
        )
    }
}

impl StructuredLog for BatchFlushed {
    fn log(&self) {
        tracing::debug!(
            size = self.size,
            capacity = self.capacity,
            trigger = %self.trigger,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "batch_flush",
            span_name = name,
            size = self.size,
            trigger = %self.trigger,
        )
    }
}

/// An item was diverted to the error channel.
///
/// # Log Level
/// `debug!` - The caller owns error handling through the error channel
pub struct ItemFailed<'a> {
    pub stage: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ItemFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stage '{}' rejected an item: {}", self.stage, self.error)
    }
}

impl StructuredLog for ItemFailed<'_> {
    fn log(&self) {
        tracing::debug!(stage = self.stage, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "item_failed",
            span_name = name,
            stage = self.stage,
            error = %self.error,
        )
    }
}

/// An error was discarded because the error channel was full, or because
/// its receiver is gone.
///
/// # Log Level
/// `warn!` - The caller is not draining errors fast enough, or stopped
/// draining them altogether
pub struct ErrorDropped<'a> {
    pub stage: &'a str,
    pub error: &'a dyn std::error::Error,
    pub dropped_total: u64,
    pub channel_closed: bool,
}

impl Display for ErrorDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let state = if self.channel_closed { "closed" } else { "full" };
        write!(
            f,
            "Error channel {}, dropped error from stage '{}' ({} dropped so far): {}",
            state, self.stage, self.dropped_total, self.error
        )
    }
}

impl StructuredLog for ErrorDropped<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            dropped_total = self.dropped_total,
            channel_closed = self.channel_closed,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "error_dropped",
            span_name = name,
            stage = self.stage,
            dropped_total = self.dropped_total,
            channel_closed = self.channel_closed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;

    #[test]
    fn test_error_dropped_names_channel_state() {
        let error = StageError::NonListValue;
        let mut event = ErrorDropped {
            stage: "reducer",
            error: &error,
            dropped_total: 3,
            channel_closed: false,
        };
        assert!(event.to_string().starts_with(
            "Error channel full, dropped error from stage 'reducer' (3 dropped so far): "
        ));

        event.channel_closed = true;
        assert!(event.to_string().starts_with("Error channel closed, "));
    }
}
