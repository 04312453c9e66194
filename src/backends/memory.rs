// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process messaging backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::SinkClosed;
use crate::message::Message;
use crate::traits::{MessageSink, PublishResult, Publisher, Subscription};

/// Subscription that delivers every message pushed into its channel.
///
/// `receive` ends gracefully once every sender is dropped and the backlog is
/// delivered. The channel can only be consumed once; a second call to
/// `receive` fails.
pub struct MemorySubscription {
    receiver: Mutex<Option<mpsc::Receiver<Message>>>,
}

impl MemorySubscription {
    /// Subscription fed through the returned sender.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Message>, MemorySubscription) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self::from_receiver(receiver))
    }

    pub fn from_receiver(receiver: mpsc::Receiver<Message>) -> Self {
        Self {
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Subscription with a fixed backlog that ends once the backlog is delivered.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let (sender, receiver) = mpsc::channel(messages.len().max(1));
        for message in messages {
            // capacity matches the backlog, so this never fails
            let _ = sender.try_send(message);
        }
        Self::from_receiver(receiver)
    }

    fn take_receiver(&self) -> anyhow::Result<mpsc::Receiver<Message>> {
        let mut slot = self
            .receiver
            .lock()
            .map_err(|_| anyhow::anyhow!("memory subscription lock poisoned"))?;
        slot.take()
            .ok_or_else(|| anyhow::anyhow!("memory subscription is already being received"))
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn receive(&self, token: CancellationToken, sink: MessageSink) -> anyhow::Result<()> {
        let mut receiver = self.take_receiver()?;
        loop {
            let message = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                message = receiver.recv() => match message {
                    Some(message) => message,
                    None => return Ok(()),
                },
            };
            if let Err(SinkClosed) = sink.deliver(message).await {
                return Ok(());
            }
        }
    }
}

/// Topic kept in memory.
///
/// Every published message is recorded with a sequential server id. A topic
/// built with [`MemoryTopic::with_subscription`] also forwards each message to
/// a [`MemorySubscription`], so publisher and pipeline can be wired together
/// in one process.
#[derive(Default)]
pub struct MemoryTopic {
    published: Mutex<Vec<Message>>,
    next_id: AtomicU64,
    forward: Option<mpsc::Sender<Message>>,
}

impl MemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(capacity: usize) -> (MemoryTopic, MemorySubscription) {
        let (sender, subscription) = MemorySubscription::channel(capacity);
        let topic = MemoryTopic {
            forward: Some(sender),
            ..Self::default()
        };
        (topic, subscription)
    }

    /// Messages accepted so far, in publish order.
    pub fn published(&self) -> Vec<Message> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    async fn accept(&self, mut message: Message) -> anyhow::Result<String> {
        let id = (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        message.id = Some(id.clone());

        if let Some(forward) = &self.forward {
            forward
                .send(message.clone())
                .await
                .map_err(|_| anyhow::anyhow!("memory topic has no subscriber"))?;
        }

        self.published
            .lock()
            .map_err(|_| anyhow::anyhow!("memory topic lock poisoned"))?
            .push(message);
        Ok(id)
    }
}

/// Outcome of a [`MemoryTopic`] publish, already settled.
pub struct MemoryPublishResult {
    outcome: Result<String, String>,
}

#[async_trait]
impl PublishResult for MemoryPublishResult {
    async fn get(&self) -> anyhow::Result<String> {
        self.outcome.clone().map_err(anyhow::Error::msg)
    }
}

#[async_trait]
impl Publisher for MemoryTopic {
    async fn publish(&self, message: Message) -> Box<dyn PublishResult> {
        let outcome = self.accept(message).await.map_err(|e| e.to_string());
        Box::new(MemoryPublishResult { outcome })
    }
}
