// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Size- and deadline-bounded batching.
//!
//! The batcher groups consecutive items into a [`Batch`] and flushes it
//! downstream when either
//!
//! * the batch reaches `batch_size` items, or
//! * `timeout` has elapsed since the first item of the batch arrived.
//!
//! The deadline is an absolute instant set once per batch, not a timer
//! re-armed on every loop iteration, so a steady trickle of items cannot
//! postpone a flush indefinitely. An empty accumulator has no deadline and
//! never produces an empty batch.
//!
//! When the input closes, any non-empty remainder is flushed before the
//! output closes. Cancellation stops the stage immediately and discards the
//! remainder.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::ops::Deref;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::config::consts::MAX_BATCH_PREALLOCATION;
use crate::config::{normalize_batch_size, normalize_batch_timeout};
use crate::engine::context::StageContext;
use crate::observability::messages::stage::{BatchFlushed, FlushTrigger, StopReason};
use crate::observability::messages::StructuredLog;
use crate::traits::{StageSummary, Step};

/// Ordered, non-empty group of items flushed by a [`Batcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T>(Vec<T>);

impl<T> Batch<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for Batch<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for Batch<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: PartialEq> PartialEq<Vec<T>> for Batch<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        &self.0 == other
    }
}

/// Roughly 30 years.
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// Accumulates items of type `T` into batches of at most `batch_size`.
pub struct Batcher<T> {
    batch_size: usize,
    timeout: Duration,
    _marker: PhantomData<fn(T)>,
}

impl<T> Batcher<T> {
    /// A zero `batch_size` becomes 100 and a zero `timeout` becomes 5 seconds.
    pub fn new(batch_size: usize, timeout: Duration) -> Self {
        Self {
            batch_size: normalize_batch_size(batch_size),
            timeout: normalize_batch_timeout(timeout),
            _marker: PhantomData,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deadline for a batch whose first item arrives now. Timeouts too large
    /// to represent as an instant mean the batch only flushes on size or
    /// when the input closes.
    fn next_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.timeout)
            .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS))
    }

    /// Empty accumulator. Large batch sizes grow on demand instead of being
    /// reserved up front.
    fn accumulator(&self) -> Vec<T> {
        Vec::with_capacity(self.batch_size.min(MAX_BATCH_PREALLOCATION))
    }

    /// Emit the accumulated items and start a fresh accumulator.
    async fn flush(
        &self,
        ctx: &StageContext,
        output: &mpsc::Sender<Batch<T>>,
        items: &mut Vec<T>,
        trigger: FlushTrigger,
    ) -> Result<(), StopReason>
    where
        T: Send,
    {
        let batch = Batch(std::mem::replace(items, self.accumulator()));
        BatchFlushed {
            size: batch.len(),
            capacity: self.batch_size,
            trigger,
        }
        .log();
        ctx.send(output, batch).await
    }
}

#[async_trait]
impl<T: Send + 'static> Step for Batcher<T> {
    type Input = T;
    type Output = Batch<T>;

    fn name(&self) -> &'static str {
        "batcher"
    }

    async fn run(
        self,
        ctx: StageContext,
        mut input: mpsc::Receiver<T>,
        output: mpsc::Sender<Batch<T>>,
    ) -> StageSummary {
        let mut items = self.accumulator();
        let mut processed = 0;

        let deadline = sleep_until(self.next_deadline());
        tokio::pin!(deadline);
        let mut armed = false;

        loop {
            let flushed = tokio::select! {
                biased;
                _ = ctx.token().cancelled() => {
                    return StageSummary::new(StopReason::Cancelled, processed);
                }
                _ = &mut deadline, if armed => {
                    armed = false;
                    self.flush(&ctx, &output, &mut items, FlushTrigger::Deadline).await
                }
                item = input.recv() => match item {
                    Some(item) => {
                        processed += 1;
                        if items.is_empty() {
                            deadline.as_mut().reset(self.next_deadline());
                            armed = true;
                        }
                        items.push(item);
                        if items.len() >= self.batch_size {
                            armed = false;
                            self.flush(&ctx, &output, &mut items, FlushTrigger::Size).await
                        } else {
                            Ok(())
                        }
                    }
                    None => {
                        if !items.is_empty() {
                            if let Err(reason) = self
                                .flush(&ctx, &output, &mut items, FlushTrigger::InputClosed)
                                .await
                            {
                                return StageSummary::new(reason, processed);
                            }
                        }
                        return StageSummary::new(StopReason::InputClosed, processed);
                    }
                },
            };

            if let Err(reason) = flushed {
                return StageSummary::new(reason, processed);
            }
        }
    }
}
