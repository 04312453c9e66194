// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::marker::PhantomData;
use tokio::sync::mpsc;

use crate::engine::context::StageContext;
use crate::errors::StageError;
use crate::traits::{StageSummary, Step};

/// Applies a transform to each item: one input gives zero or one output.
///
/// A failing transform sends the error to the error channel and the stage
/// carries on with the next item.
pub struct Mapper<F, T, U> {
    map_fn: F,
    _marker: PhantomData<fn(T) -> U>,
}

impl<F, T, U> Mapper<F, T, U>
where
    F: Fn(T) -> anyhow::Result<U>,
{
    pub fn new(map_fn: F) -> Self {
        Self {
            map_fn,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Step for Mapper<F, T, U>
where
    F: Fn(T) -> anyhow::Result<U> + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    fn name(&self) -> &'static str {
        "mapper"
    }

    async fn run(
        self,
        ctx: StageContext,
        mut input: mpsc::Receiver<T>,
        output: mpsc::Sender<U>,
    ) -> StageSummary {
        let mut processed = 0;
        loop {
            let item = match ctx.recv(&mut input).await {
                Ok(item) => item,
                Err(reason) => return StageSummary::new(reason, processed),
            };
            processed += 1;

            let result = (self.map_fn)(item);
            match result {
                Ok(mapped) => {
                    if let Err(reason) = ctx.send(&output, mapped).await {
                        return StageSummary::new(reason, processed);
                    }
                }
                Err(error) => ctx.report(self.name(), StageError::Map(error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::ErrorSink;
    use crate::observability::messages::stage::StopReason;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};
    use tokio_util::sync::CancellationToken;

    const WAIT: Duration = Duration::from_secs(1);

    struct Harness<U> {
        input: mpsc::Sender<i64>,
        output: mpsc::Receiver<U>,
        errors: mpsc::Receiver<StageError>,
        token: CancellationToken,
        task: tokio::task::JoinHandle<()>,
    }

    fn start<U, F>(map_fn: F) -> Harness<U>
    where
        F: Fn(i64) -> anyhow::Result<U> + Send + 'static,
        U: Send + 'static,
    {
        let token = CancellationToken::new();
        let (sink, errors) = ErrorSink::channel(16);
        let ctx = StageContext::new(token.clone(), sink, 1);
        let (input, input_rx) = mpsc::channel(1);
        let handle = Mapper::new(map_fn).spawn(&ctx, 1, input_rx);
        Harness {
            input,
            output: handle.output,
            errors,
            token,
            task: handle.task,
        }
    }

    fn fill(input: mpsc::Sender<i64>, count: i64) {
        tokio::spawn(async move {
            for i in 0..count {
                if input.send(i).await.is_err() {
                    return;
                }
            }
        });
    }

    #[tokio::test]
    async fn test_no_input_produces_nothing() {
        let mut harness = start(|i: i64| Ok(i));

        sleep(Duration::from_millis(50)).await;

        assert!(harness.output.try_recv().is_err());
        assert!(harness.errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_doubles_each_value_in_order() {
        let mut harness = start(|i: i64| Ok(i * 2));
        fill(harness.input.clone(), 10);

        for i in 0..10 {
            let value = timeout(WAIT, harness.output.recv()).await.unwrap();
            assert_eq!(value, Some(i * 2));
        }
        assert!(harness.errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_on_one_item_keeps_the_rest() {
        let mut harness = start(|i: i64| {
            if i == 3 {
                anyhow::bail!("cannot map item {}", i);
            }
            Ok(i)
        });
        fill(harness.input.clone(), 6);

        let mut outputs = Vec::new();
        for _ in 0..5 {
            outputs.push(timeout(WAIT, harness.output.recv()).await.unwrap().unwrap());
        }
        assert_eq!(outputs, vec![0, 1, 2, 4, 5]);

        let error = timeout(WAIT, harness.errors.recv()).await.unwrap().unwrap();
        assert!(matches!(error, StageError::Map(_)));
        assert_eq!(error.to_string(), "map step failed: cannot map item 3");
        assert!(harness.errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_every_item_failing_produces_no_output() {
        let mut harness = start(|_: i64| -> anyhow::Result<String> {
            anyhow::bail!("could not cast input value into a string")
        });
        fill(harness.input.clone(), 3);

        for _ in 0..3 {
            let error = timeout(WAIT, harness.errors.recv()).await.unwrap();
            assert!(error.is_some());
        }
        assert!(harness.output.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_input_closes_output() {
        let mut harness = start(|i: i64| Ok(i));
        drop(harness.input);

        assert_eq!(timeout(WAIT, harness.output.recv()).await.unwrap(), None);
        timeout(WAIT, harness.task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_closes_output() {
        let mut harness = start(|i: i64| Ok(i));
        harness.token.cancel();

        assert_eq!(timeout(WAIT, harness.output.recv()).await.unwrap(), None);
        timeout(WAIT, harness.task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_stop_reason() {
        let token = CancellationToken::new();
        let (sink, _errors) = ErrorSink::channel(1);
        let ctx = StageContext::new(token, sink, 1);
        let (input, input_rx) = mpsc::channel(4);
        let (output, _output_rx) = mpsc::channel(4);
        input.send(1_i64).await.unwrap();
        input.send(2).await.unwrap();
        drop(input);

        let summary = Mapper::new(|i: i64| Ok(i)).run(ctx, input_rx, output).await;

        assert_eq!(summary, StageSummary::new(StopReason::InputClosed, 2));
    }
}
