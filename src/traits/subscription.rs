use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::SinkClosed;
use crate::message::Message;

/// Something that delivers messages the way a messaging subscription does.
///
/// `receive` blocks: it hands every outstanding message to `sink` until
/// `token` is cancelled or the transport fails with a non-retryable error.
/// Returning `Ok(())` marks a graceful end of stream. Implementations should
/// stop once [`MessageSink::deliver`] reports [`SinkClosed`].
#[async_trait]
pub trait Subscription: Send + Sync {
    async fn receive(&self, token: CancellationToken, sink: MessageSink) -> anyhow::Result<()>;
}

/// Callback side of the receiver stage.
///
/// Delivering waits for room in the receiver's output channel, so a slow
/// consumer anywhere downstream slows down message acknowledgment.
#[derive(Clone)]
pub struct MessageSink {
    sender: mpsc::Sender<Message>,
    token: CancellationToken,
    delivered: Arc<AtomicU64>,
}

impl MessageSink {
    pub fn new(sender: mpsc::Sender<Message>, token: CancellationToken) -> Self {
        Self {
            sender,
            token,
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Push one message into the pipeline.
    pub async fn deliver(&self, message: Message) -> Result<(), SinkClosed> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(SinkClosed),
            sent = self.sender.send(message) => {
                sent.map_err(|_| SinkClosed)?;
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.sender.is_closed()
    }

    /// Messages accepted so far, across all clones of this sink.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}
