use async_trait::async_trait;

use crate::message::Message;

/// Outbound side of a messaging topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Queue `message` for publication. The returned handle resolves once the
    /// server has accepted or rejected it.
    async fn publish(&self, message: Message) -> Box<dyn PublishResult>;
}

/// Pending outcome of a single publish call.
#[async_trait]
pub trait PublishResult: Send + Sync {
    /// Wait for the server-assigned message id.
    async fn get(&self) -> anyhow::Result<String>;
}
