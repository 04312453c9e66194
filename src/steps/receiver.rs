// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::engine::context::StageContext;
use crate::errors::StageError;
use crate::message::Message;
use crate::observability::messages::pipeline::{SubscriptionEnded, SubscriptionFailed};
use crate::observability::messages::stage::StopReason;
use crate::observability::messages::StructuredLog;
use crate::traits::{MessageSink, StageSummary, Step, Subscription};

/// First stage of every pipeline: pulls raw messages out of a subscription.
///
/// The stage is the pipeline's source, so its input type is uninhabited and
/// the input channel is never read. Its task calls the subscription's
/// blocking `receive`, forwarding each delivered message to the output
/// channel. A receive error is reported once on the error channel; the output
/// is closed in every case when `receive` returns.
pub struct SubscriberReceiver {
    subscription: Arc<dyn Subscription>,
}

impl SubscriberReceiver {
    pub fn new(subscription: Arc<dyn Subscription>) -> Self {
        Self { subscription }
    }
}

#[async_trait]
impl Step for SubscriberReceiver {
    type Input = Infallible;
    type Output = Message;

    fn name(&self) -> &'static str {
        "receiver"
    }

    async fn run(
        self,
        ctx: StageContext,
        _input: mpsc::Receiver<Infallible>,
        output: mpsc::Sender<Message>,
    ) -> StageSummary {
        let sink = MessageSink::new(output, ctx.token().clone());
        let result = self
            .subscription
            .receive(ctx.token().clone(), sink.clone())
            .await;
        let delivered = sink.delivered();

        match result {
            Ok(()) => SubscriptionEnded { delivered }.log(),
            Err(error) => {
                SubscriptionFailed {
                    delivered,
                    error: &*error,
                }
                .log();
                ctx.report(self.name(), StageError::Subscription(error));
            }
        }

        let reason = if ctx.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::SourceEnded
        };
        StageSummary::new(reason, delivered)
    }
}
