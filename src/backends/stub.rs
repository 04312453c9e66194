// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message::Message;
use crate::traits::{MessageSink, PublishResult, Publisher, Subscription};

/// A subscription that delivers its messages and then fails
pub struct FailingSubscription {
    pub messages: Vec<Message>,
    pub error: String,
}

impl FailingSubscription {
    pub fn new(messages: Vec<Message>, error: impl Into<String>) -> Self {
        Self {
            messages,
            error: error.into(),
        }
    }
}

#[async_trait]
impl Subscription for FailingSubscription {
    async fn receive(&self, _token: CancellationToken, sink: MessageSink) -> anyhow::Result<()> {
        for message in &self.messages {
            if sink.deliver(message.clone()).await.is_err() {
                return Ok(());
            }
        }
        Err(anyhow::anyhow!("{}", self.error))
    }
}

/// A subscription that never delivers and only returns once cancelled
pub struct BlockingSubscription;

#[async_trait]
impl Subscription for BlockingSubscription {
    async fn receive(&self, token: CancellationToken, _sink: MessageSink) -> anyhow::Result<()> {
        token.cancelled().await;
        Ok(())
    }
}

/// A topic that rejects every publish for testing failure scenarios
pub struct FailingTopic {
    pub error: String,
}

impl FailingTopic {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

struct RejectedPublish {
    error: String,
}

#[async_trait]
impl PublishResult for RejectedPublish {
    async fn get(&self) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("{}", self.error))
    }
}

#[async_trait]
impl Publisher for FailingTopic {
    async fn publish(&self, _message: Message) -> Box<dyn PublishResult> {
        Box::new(RejectedPublish {
            error: self.error.clone(),
        })
    }
}
