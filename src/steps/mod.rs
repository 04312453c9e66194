// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The four stage kinds a subscriber pipeline is assembled from.

pub mod batcher;
pub mod mapper;
pub mod receiver;
pub mod reducer;

pub use batcher::{Batch, Batcher};
pub use mapper::Mapper;
pub use receiver::SubscriberReceiver;
pub use reducer::{Reducer, Sequence};
