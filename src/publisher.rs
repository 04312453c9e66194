// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed publishing on top of a [`Publisher`].

use serde::Serialize;
use std::collections::HashMap;

use crate::errors::PublishError;
use crate::message::{Message, TRACE_ID_ATTRIBUTE};
use crate::observability::messages::pipeline::PublishCompleted;
use crate::observability::messages::StructuredLog;
use crate::traits::Publisher;

/// One payload to publish, with its message attributes.
#[derive(Debug, Clone)]
pub struct PublishInput<T> {
    pub data: T,
    pub attributes: HashMap<String, String>,
}

impl<T> PublishInput<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Serializes payloads to JSON and publishes them one by one.
pub struct PublisherClient<P> {
    topic: P,
}

impl<P: Publisher> PublisherClient<P> {
    pub fn new(topic: P) -> Self {
        Self { topic }
    }

    pub fn topic(&self) -> &P {
        &self.topic
    }

    /// Publish every input in order and wait for each to be acknowledged.
    ///
    /// Every message carries the `trace_id` attribute, empty when no trace is
    /// active. A failing input does not stop the rest; the returned list holds
    /// one error per failed input and is empty when everything went through.
    pub async fn publish<T: Serialize>(
        &self,
        trace_id: Option<&str>,
        inputs: Vec<PublishInput<T>>,
    ) -> Vec<PublishError> {
        let mut errors = Vec::new();
        let total = inputs.len();

        for (index, input) in inputs.into_iter().enumerate() {
            let data = match serde_json::to_vec(&input.data) {
                Ok(data) => data,
                Err(source) => {
                    errors.push(PublishError::Serialize { index, source });
                    continue;
                }
            };

            let mut message = Message::new(data);
            message.attributes = input.attributes;
            message
                .attributes
                .insert(TRACE_ID_ATTRIBUTE.to_string(), trace_id.unwrap_or_default().to_string());

            let result = self.topic.publish(message).await;
            if let Err(source) = result.get().await {
                errors.push(PublishError::Publish { index, source });
            }
        }

        PublishCompleted {
            published: total - errors.len(),
            failed: errors.len(),
        }
        .log();
        errors
    }
}
