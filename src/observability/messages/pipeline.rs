// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline wiring and subscription lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Pipeline wired and all stage tasks spawned.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use subpipe::observability::messages::pipeline::PipelineStarted;
///
/// let msg = PipelineStarted {
///     stages: &["receiver", "mapper", "batcher"],
///     channel_capacity: 1,
///     error_buffer: 64,
/// };
///
/// assert!(msg.to_string().contains("receiver -> mapper -> batcher"));
/// ```
pub struct PipelineStarted<'a> {
    pub stages: &'a [&'static str],
    pub channel_capacity: usize,
    pub error_buffer: usize,
}

impl Display for PipelineStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting subscriber pipeline with {} stages ({}): channel_capacity={}, error_buffer={}",
            self.stages.len(),
            self.stages.join(" -> "),
            self.channel_capacity,
            self.error_buffer
        )
    }
}

impl StructuredLog for PipelineStarted<'_> {
    fn log(&self) {
        tracing::info!(
            stage_count = self.stages.len(),
            channel_capacity = self.channel_capacity,
            error_buffer = self.error_buffer,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            stage_count = self.stages.len(),
        )
    }
}

/// The subscription's receive call returned without error.
///
/// # Log Level
/// `info!` - Source reached its natural end
pub struct SubscriptionEnded {
    pub delivered: u64,
}

impl Display for SubscriptionEnded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subscription receive returned after delivering {} messages",
            self.delivered
        )
    }
}

impl StructuredLog for SubscriptionEnded {
    fn log(&self) {
        tracing::info!(delivered = self.delivered, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "subscription_ended",
            span_name = name,
            delivered = self.delivered,
        )
    }
}

/// The subscription's receive call returned a terminal error.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SubscriptionFailed<'a> {
    pub delivered: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for SubscriptionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subscription receive failed after delivering {} messages: {}",
            self.delivered, self.error
        )
    }
}

impl StructuredLog for SubscriptionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            delivered = self.delivered,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "subscription_failed",
            span_name = name,
            error = %self.error,
        )
    }
}

/// Outcome of publishing a group of messages.
///
/// # Log Level
/// `debug!` when every message succeeded, `warn!` otherwise
pub struct PublishCompleted {
    pub published: usize,
    pub failed: usize,
}

impl Display for PublishCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Published {} messages, {} failed",
            self.published, self.failed
        )
    }
}

impl StructuredLog for PublishCompleted {
    fn log(&self) {
        if self.failed == 0 {
            tracing::debug!(published = self.published, "{}", self);
        } else {
            tracing::warn!(
                published = self.published,
                failed = self.failed,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "publish",
            span_name = name,
            published = self.published,
            failed = self.failed,
        )
    }
}
