// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod context;
pub mod pipeline;
#[cfg(test)]
pub mod integration_tests;

pub use context::{ErrorSink, StageContext};
pub use pipeline::{PipelineHandle, PipelineParams, RunningPipeline, SubscriberPipeline};
