// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it at its level with typed fields attached.

use std::fmt::Display;
use tracing::Span;

pub mod pipeline;
pub mod stage;

/// A log event that knows its level and its structured fields.
pub trait StructuredLog: Display {
    /// Emit the event at its documented level.
    fn log(&self);

    /// Span carrying the same fields, for instrumenting the work the event describes.
    fn span(&self, name: &str) -> Span;
}
