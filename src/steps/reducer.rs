// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::marker::PhantomData;
use tokio::sync::mpsc;

use crate::engine::context::StageContext;
use crate::errors::StageError;
use crate::steps::batcher::Batch;
use crate::traits::{StageSummary, Step};

/// Input that a [`Reducer`] can fold over.
///
/// `into_items` returns `None` when the value turns out not to be a list at
/// runtime. Only dynamically typed inputs can fail this way.
pub trait Sequence: Send + 'static {
    type Item: Send + 'static;

    fn into_items(self) -> Option<Vec<Self::Item>>;
}

impl<T: Send + 'static> Sequence for Vec<T> {
    type Item = T;

    fn into_items(self) -> Option<Vec<T>> {
        Some(self)
    }
}

impl<T: Send + 'static> Sequence for Batch<T> {
    type Item = T;

    fn into_items(self) -> Option<Vec<T>> {
        Some(self.into_inner())
    }
}

impl Sequence for serde_json::Value {
    type Item = serde_json::Value;

    fn into_items(self) -> Option<Vec<serde_json::Value>> {
        match self {
            serde_json::Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Folds each incoming sequence into one accumulated value.
///
/// `reduce_fn` receives the running state, the item and the item's position
/// within the sequence.
///
/// Every sequence starts from a fresh `initial_state()`, so nothing carries
/// over from one input to the next. A failing fold step discards the whole
/// sequence: the error goes to the error channel and nothing is emitted.
pub struct Reducer<F, I, In, S> {
    reduce_fn: F,
    initial_state: I,
    _marker: PhantomData<fn(In) -> S>,
}

impl<F, I, In, S> Reducer<F, I, In, S>
where
    In: Sequence,
    F: Fn(S, In::Item, usize) -> anyhow::Result<S>,
    I: Fn() -> S,
{
    pub fn new(reduce_fn: F, initial_state: I) -> Self {
        Self {
            reduce_fn,
            initial_state,
            _marker: PhantomData,
        }
    }

    /// Fold one sequence. Fails on the first step that returns an error.
    pub fn fold(&self, input: In) -> Result<S, StageError> {
        let items = input.into_items().ok_or(StageError::NonListValue)?;
        items
            .into_iter()
            .enumerate()
            .try_fold((self.initial_state)(), |state, (index, item)| {
                (self.reduce_fn)(state, item, index)
                    .map_err(|source| StageError::Reduce { index, source })
            })
    }
}

#[async_trait]
impl<F, I, In, S> Step for Reducer<F, I, In, S>
where
    In: Sequence,
    F: Fn(S, In::Item, usize) -> anyhow::Result<S> + Send + 'static,
    I: Fn() -> S + Send + 'static,
    S: Send + 'static,
{
    type Input = In;
    type Output = S;

    fn name(&self) -> &'static str {
        "reducer"
    }

    async fn run(
        self,
        ctx: StageContext,
        mut input: mpsc::Receiver<In>,
        output: mpsc::Sender<S>,
    ) -> StageSummary {
        let mut processed = 0;
        loop {
            let sequence = match ctx.recv(&mut input).await {
                Ok(sequence) => sequence,
                Err(reason) => return StageSummary::new(reason, processed),
            };
            processed += 1;

            let result = self.fold(sequence);
            match result {
                Ok(state) => {
                    if let Err(reason) = ctx.send(&output, state).await {
                        return StageSummary::new(reason, processed);
                    }
                }
                Err(error) => ctx.report(self.name(), error),
            }
        }
    }
}
