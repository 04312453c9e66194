// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Log events are plain structs implementing `Display` plus
//! [`StructuredLog`](messages::StructuredLog), so the wording of every event
//! lives in one place and call sites only fill in fields.
//!
//! * `messages::pipeline` - pipeline wiring and subscription lifecycle events
//! * `messages::stage` - per-stage lifecycle, batching and error events
//! * `logging` - subscriber installation for binaries
//!
//! # Usage
//!
//! ```rust
//! use subpipe::observability::messages::{stage::StageStarted, StructuredLog};
//!
//! StageStarted { stage: "mapper", position: 1 }.log();
//! ```

pub mod logging;
pub mod messages;
