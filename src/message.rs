// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Raw subscription payloads as they enter the pipeline.

use std::collections::HashMap;

/// Attribute key carrying the trace id stamped by the publisher client.
pub const TRACE_ID_ATTRIBUTE: &str = "trace_id";

/// A message delivered by a [`Subscription`](crate::traits::Subscription).
///
/// Only the receiver stage produces this type. Downstream stages see whatever
/// the caller's map function turns it into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id, when the transport provides one.
    pub id: Option<String>,
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            data: data.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Decode the payload as JSON into `T`.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
