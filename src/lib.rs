// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // subscription/topic transports
pub mod config;     // pipeline config loading
pub mod engine;     // pipeline wiring + stage context
pub mod errors;     // error handling
pub mod message;
pub mod observability;
pub mod publisher;  // typed publishing client
pub mod steps;      // receiver, mapper, batcher, reducer
pub mod traits;     // collaborator abstractions

pub use engine::{PipelineParams, RunningPipeline, SubscriberPipeline};
pub use message::Message;
pub use steps::Batch;
