// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::engine::context::{ErrorSink, StageContext};
use crate::errors::{Error, StageError};
use crate::message::Message;
use crate::observability::messages::pipeline::PipelineStarted;
use crate::observability::messages::StructuredLog;
use crate::steps::{Batch, Batcher, Mapper, Reducer, Sequence, SubscriberReceiver};
use crate::traits::{Step, Subscription};

/// Deferred stage spawning: called once by [`SubscriberPipeline::run`], it
/// spawns every stage in order and returns the last output channel.
type Wiring<T> =
    Box<dyn FnOnce(&StageContext, &mut Vec<JoinHandle<()>>) -> mpsc::Receiver<T> + Send>;

/// Inputs for [`SubscriberPipeline::new`].
#[derive(Default, Clone)]
pub struct PipelineParams {
    pub subscription: Option<Arc<dyn Subscription>>,
    pub config: PipelineConfig,
}

impl PipelineParams {
    pub fn new(subscription: Arc<dyn Subscription>) -> Self {
        Self {
            subscription: Some(subscription),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }
}

/// Ordered chain of stages fed by a subscription.
///
/// A pipeline always starts with the receiver stage, so a fresh pipeline
/// yields raw [`Message`]s. Each builder call appends one stage and changes
/// the item type flowing out of the pipeline:
///
/// ```text
/// SubscriberPipeline<Message>
///     .map(decode)        -> SubscriberPipeline<Order>
///     .batch(50, 2s)      -> SubscriberPipeline<Batch<Order>>
///     .reduce(total, ..)  -> SubscriberPipeline<Summary>
/// ```
///
/// Nothing is spawned until [`run`](SubscriberPipeline::run), which consumes
/// the pipeline. Stage *i*'s output channel becomes stage *i + 1*'s input,
/// and every stage shares one bounded error channel.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use subpipe::backends::memory::MemorySubscription;
/// use subpipe::engine::{PipelineParams, SubscriberPipeline};
/// use subpipe::message::Message;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let subscription = MemorySubscription::from_messages(vec![
///     Message::new("1"),
///     Message::new("2"),
///     Message::new("3"),
/// ]);
///
/// let mut running = SubscriberPipeline::new(PipelineParams::new(Arc::new(subscription)))?
///     .map(|msg: Message| Ok(String::from_utf8(msg.data)?.parse::<i64>()?))
///     .batch(10, Duration::from_millis(100))
///     .reduce(|sum: i64, value: i64, _| Ok(sum + value), || 0)
///     .run(CancellationToken::new());
///
/// assert_eq!(running.recv().await, Some(6));
/// assert_eq!(running.recv().await, None);
/// running.join().await?;
/// # Ok(())
/// # }
/// ```
pub struct SubscriberPipeline<T> {
    config: PipelineConfig,
    stages: Vec<&'static str>,
    wiring: Wiring<T>,
}

impl SubscriberPipeline<Message> {
    /// Pipeline with only the receiver stage.
    ///
    /// Fails with `MISSING_REQUIRED_DEPENDENCY` when no subscription is given.
    pub fn new(params: PipelineParams) -> Result<Self, Error> {
        let subscription = params
            .subscription
            .ok_or_else(|| Error::missing_required_dependency("subscription"))?;

        let receiver = SubscriberReceiver::new(subscription);
        let stages = vec![receiver.name()];
        let wiring: Wiring<Message> = Box::new(
            move |ctx: &StageContext, tasks: &mut Vec<JoinHandle<()>>| {
                // the receiver is the source; its input is never sent on
                let (_unused, input) = mpsc::channel(1);
                let handle = receiver.spawn(ctx, 0, input);
                tasks.push(handle.task);
                handle.output
            },
        );

        Ok(Self {
            config: params.config,
            stages,
            wiring,
        })
    }

    /// Like [`new`](SubscriberPipeline::new) but panics on error.
    ///
    /// The panic payload is the [`Error`] itself, so a caller catching the
    /// unwind can still inspect its kind and code.
    pub fn must_new(params: PipelineParams) -> Self {
        match Self::new(params) {
            Ok(pipeline) => pipeline,
            Err(err) => std::panic::panic_any(err),
        }
    }
}

impl<T: Send + 'static> SubscriberPipeline<T> {
    /// Append any [`Step`] that consumes this pipeline's items.
    pub fn step<S>(self, step: S) -> SubscriberPipeline<S::Output>
    where
        S: Step<Input = T>,
    {
        let position = self.stages.len();
        let mut stages = self.stages;
        stages.push(step.name());

        let upstream = self.wiring;
        let wiring: Wiring<S::Output> = Box::new(
            move |ctx: &StageContext, tasks: &mut Vec<JoinHandle<()>>| {
                let input = upstream(ctx, tasks);
                let handle = step.spawn(ctx, position, input);
                tasks.push(handle.task);
                handle.output
            },
        );

        SubscriberPipeline {
            config: self.config,
            stages,
            wiring,
        }
    }

    /// Append a [`Mapper`] stage.
    pub fn map<U, F>(self, map_fn: F) -> SubscriberPipeline<U>
    where
        F: Fn(T) -> anyhow::Result<U> + Send + 'static,
        U: Send + 'static,
    {
        self.step(Mapper::new(map_fn))
    }

    /// Append a [`Batcher`] stage. Zero values fall back to the defaults.
    pub fn batch(self, batch_size: usize, timeout: Duration) -> SubscriberPipeline<Batch<T>> {
        self.step(Batcher::new(batch_size, timeout))
    }

    /// Append a [`Batcher`] stage sized by the pipeline's `batch` config.
    pub fn batch_from_config(self) -> SubscriberPipeline<Batch<T>> {
        let size = self.config.batch.get_size();
        let timeout = self.config.batch.get_timeout();
        self.batch(size, timeout)
    }

    /// Append a [`Reducer`] stage folding each incoming sequence.
    pub fn reduce<S, F, I>(self, reduce_fn: F, initial_state: I) -> SubscriberPipeline<S>
    where
        T: Sequence,
        F: Fn(S, T::Item, usize) -> anyhow::Result<S> + Send + 'static,
        I: Fn() -> S + Send + 'static,
        S: Send + 'static,
    {
        self.step(Reducer::new(reduce_fn, initial_state))
    }

    /// Stage names in wiring order.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Spawn one task per stage and start consuming the subscription.
    ///
    /// Must be called from within a tokio runtime. Cancelling `token` stops
    /// every stage; each stage then closes its output channel.
    pub fn run(self, token: CancellationToken) -> RunningPipeline<T> {
        let channel_capacity = self.config.get_channel_capacity().max(1);
        let error_buffer = self.config.get_error_buffer().max(1);

        PipelineStarted {
            stages: &self.stages,
            channel_capacity,
            error_buffer,
        }
        .log();

        let (error_sink, errors) = ErrorSink::channel(error_buffer);
        let dropped = error_sink.dropped_counter();
        let ctx = StageContext::new(token.clone(), error_sink, channel_capacity);

        let mut tasks = Vec::with_capacity(self.stages.len());
        let output = (self.wiring)(&ctx, &mut tasks);
        // stages hold their own clones; the error channel closes when the last one ends
        drop(ctx);

        RunningPipeline {
            output,
            errors,
            handle: PipelineHandle {
                token,
                tasks,
                dropped,
            },
        }
    }
}

/// Control side of a running pipeline.
pub struct PipelineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl PipelineHandle {
    /// Cancel the pipeline's token, stopping every stage.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Errors discarded because the error channel was full or closed.
    pub fn dropped_errors(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// True once every stage task has returned.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every stage task to return.
    pub async fn join(self) -> Result<(), JoinError> {
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}

/// A pipeline whose stage tasks are running.
///
/// Outputs and errors arrive on separate channels with no ordering between
/// them. Errors that nobody drains are dropped once the error buffer is full
/// and show up in [`dropped_errors`](RunningPipeline::dropped_errors); they
/// never stall the stages.
pub struct RunningPipeline<T> {
    output: mpsc::Receiver<T>,
    errors: mpsc::Receiver<StageError>,
    handle: PipelineHandle,
}

impl<T> RunningPipeline<T> {
    /// Next item from the last stage, or `None` once the pipeline has stopped.
    pub async fn recv(&mut self) -> Option<T> {
        self.output.recv().await
    }

    /// The shared error channel. It closes after every stage has stopped.
    pub fn errors(&mut self) -> &mut mpsc::Receiver<StageError> {
        &mut self.errors
    }

    pub fn dropped_errors(&self) -> u64 {
        self.handle.dropped_errors()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Split into output channel, error channel and handle, so that outputs
    /// and errors can be drained from different tasks.
    pub fn into_parts(self) -> (mpsc::Receiver<T>, mpsc::Receiver<StageError>, PipelineHandle) {
        (self.output, self.errors, self.handle)
    }

    /// Release both channels and wait for every stage task to return.
    ///
    /// Stages still blocked on their input keep running until the source ends
    /// or the pipeline is cancelled.
    pub async fn join(self) -> Result<(), JoinError> {
        let (output, errors, handle) = self.into_parts();
        drop(output);
        drop(errors);
        handle.join().await
    }
}
