// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transport implementations of [`Subscription`](crate::traits::Subscription)
//! and [`Publisher`](crate::traits::Publisher).
//!
//! # Available Backends
//!
//! ## Memory Backend
//! In-process topic and subscription connected by a tokio channel:
//! - **MemorySubscription**: delivers whatever is pushed into its sender
//! - **MemoryTopic**: records published messages and optionally forwards them
//! - **Use Case**: the `subpipe` binary, integration tests, local prototyping
//!
//! ## Stub Backend (Test-Only)
//! Failure injection for stage and pipeline tests (only available in test builds):
//! - **FailingSubscription**: delivers a fixed set of messages, then fails
//! - **BlockingSubscription**: delivers nothing until cancelled
//! - **FailingTopic**: rejects every publish
//!
//! # Examples
//!
//! ```rust
//! use subpipe::backends::memory::MemorySubscription;
//! use subpipe::message::Message;
//!
//! let (sender, subscription) = MemorySubscription::channel(16);
//! sender.try_send(Message::new("hello")).unwrap();
//! # drop(subscription);
//! ```

pub mod memory;
#[cfg(test)]
pub mod stub;
