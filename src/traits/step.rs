use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::engine::context::StageContext;
use crate::observability::messages::stage::{StageStarted, StageStopped, StopReason};
use crate::observability::messages::StructuredLog;

/// How a stage task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSummary {
    pub reason: StopReason,
    /// Items taken from the input (or delivered by the subscription, for the receiver).
    pub processed: u64,
}

impl StageSummary {
    pub fn new(reason: StopReason, processed: u64) -> Self {
        Self { reason, processed }
    }
}

/// A spawned stage: its output channel and the task feeding it.
pub struct StageHandle<T> {
    pub output: mpsc::Receiver<T>,
    pub task: JoinHandle<()>,
}

/// One unit of a subscriber pipeline.
///
/// A step owns a single worker task for the lifetime of the pipeline. It reads
/// from the previous stage's output, writes to its own output and reports
/// per-item failures through [`StageContext::report`] without stopping. The
/// task returns when its input closes, its output is dropped, or the
/// pipeline's cancellation token fires; returning drops `output`, which closes
/// the channel for the next stage.
#[async_trait]
pub trait Step: Send + Sized + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn name(&self) -> &'static str;

    /// Stage loop. Runs inside the task spawned by [`Step::spawn`].
    async fn run(
        self,
        ctx: StageContext,
        input: mpsc::Receiver<Self::Input>,
        output: mpsc::Sender<Self::Output>,
    ) -> StageSummary;

    /// Start the stage task on `input` and hand back its output channel.
    fn spawn(
        self,
        ctx: &StageContext,
        position: usize,
        input: mpsc::Receiver<Self::Input>,
    ) -> StageHandle<Self::Output> {
        let (output_tx, output) = mpsc::channel(ctx.channel_capacity());
        let stage = self.name();

        let started = StageStarted { stage, position };
        let span = started.span("stage");
        started.log();

        let ctx = ctx.clone();
        let task = tokio::spawn(
            async move {
                let summary = self.run(ctx, input, output_tx).await;
                StageStopped {
                    stage,
                    reason: summary.reason,
                    processed: summary.processed,
                }
                .log();
            }
            .instrument(span),
        );

        StageHandle { output, task }
    }
}
