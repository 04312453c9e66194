// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared state handed to every stage task.
//!
//! A [`StageContext`] bundles the pipeline-wide cancellation token, the shared
//! error channel and the inter-stage channel capacity. Stages never touch the
//! token or the channels directly for their hot path; they go through
//! [`StageContext::recv`] and [`StageContext::send`], which race every channel
//! operation against cancellation so that a cancelled pipeline never leaves a
//! task parked on a full or empty channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::errors::StageError;
use crate::observability::messages::stage::{ErrorDropped, ItemFailed, StopReason};
use crate::observability::messages::StructuredLog;

/// Sending half of the shared error channel.
///
/// Sends never wait. When the channel is full, or its receiver has been
/// dropped, the error is discarded, counted and logged at warn, so a caller
/// that does not drain errors cannot stall the pipeline.
#[derive(Clone)]
pub struct ErrorSink {
    sender: mpsc::Sender<StageError>,
    dropped: Arc<AtomicU64>,
}

impl ErrorSink {
    /// Create the error channel. `capacity` must be at least 1.
    pub fn channel(capacity: usize) -> (ErrorSink, mpsc::Receiver<StageError>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let sink = ErrorSink {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, receiver)
    }

    /// Best-effort send. Returns `false` when the error was dropped.
    pub fn emit(&self, error: StageError) -> bool {
        let (error, channel_closed) = match self.sender.try_send(error) {
            Ok(()) => return true,
            Err(TrySendError::Full(error)) => (error, false),
            Err(TrySendError::Closed(error)) => (error, true),
        };

        let dropped_total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        ErrorDropped {
            stage: error.stage(),
            error: &error,
            dropped_total,
            channel_closed,
        }
        .log();
        false
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared counter behind [`ErrorSink::dropped`], readable after the sink is gone.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

/// Per-pipeline context cloned into each stage task.
#[derive(Clone)]
pub struct StageContext {
    token: CancellationToken,
    errors: ErrorSink,
    channel_capacity: usize,
}

impl StageContext {
    pub fn new(token: CancellationToken, errors: ErrorSink, channel_capacity: usize) -> Self {
        Self {
            token,
            errors,
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    /// Next item from `input`, or the reason the stage has to stop.
    pub async fn recv<T>(&self, input: &mut mpsc::Receiver<T>) -> Result<T, StopReason> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StopReason::Cancelled),
            item = input.recv() => item.ok_or(StopReason::InputClosed),
        }
    }

    /// Send `item` downstream, waiting for room unless the pipeline is cancelled.
    pub async fn send<T>(&self, output: &mpsc::Sender<T>, item: T) -> Result<(), StopReason> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StopReason::Cancelled),
            sent = output.send(item) => sent.map_err(|_| StopReason::OutputClosed),
        }
    }

    /// Divert a failed item to the error channel.
    pub fn report(&self, stage: &str, error: StageError) {
        ItemFailed {
            stage,
            error: &error,
        }
        .log();
        self.errors.emit(error);
    }
}
