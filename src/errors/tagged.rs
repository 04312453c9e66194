// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tagged errors with a machine-readable kind and code.
//!
//! An [`Error`] is created once, by the code that found the problem, and then
//! travels up the call stack. Its [`ErrorKind`] expresses the semantics of the
//! failure and its [`ErrorCode`] identifies it uniquely. Both can be recovered
//! from any error chain that wraps a tagged error with [`kind_of`] and
//! [`code_of`].

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

/// Broad category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// Nothing more specific was attached.
    #[default]
    Unexpected,
    /// Data conflicts with the current state of the system.
    Conflict,
    /// Failed I/O calls or invalid internal states.
    Internal,
    /// Invalid values in the input.
    InvalidInput,
    /// A required resource does not exist.
    NotFound,
    Unauthenticated,
    Unauthorized,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "UNEXPECTED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable identifier of a specific failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode(Cow<'static, str>);

impl ErrorCode {
    pub const UNKNOWN: ErrorCode = ErrorCode::from_static("UNKNOWN");
    pub const MISSING_REQUIRED_DEPENDENCY: ErrorCode =
        ErrorCode::from_static("MISSING_REQUIRED_DEPENDENCY");

    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    pub fn new(code: impl Into<String>) -> Self {
        Self(Cow::Owned(code.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error carrying a kind, a code and a human-readable message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// New error with [`ErrorKind::Unexpected`] and [`ErrorCode::UNKNOWN`].
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::default(),
            code: ErrorCode::default(),
            message: message.into(),
            source: None,
        }
    }

    /// Wrap `source`, keeping it reachable through `std::error::Error::source`.
    pub fn wrap<E>(source: E, message: impl Into<String>) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            source: Some(Box::new(source)),
            ..Self::new(message)
        }
    }

    /// Error produced by constructors when a mandatory collaborator is absent.
    pub fn missing_required_dependency(name: &str) -> Self {
        Self::new(format!("missing required dependency: {}", name))
            .with_code(ErrorCode::MISSING_REQUIRED_DEPENDENCY)
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// First tagged [`Error`] found walking `err` and its sources.
pub fn find_tagged<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(tagged) = e.downcast_ref::<Error>() {
            return Some(tagged);
        }
        current = e.source();
    }
    None
}

/// Kind of the first tagged error in the chain, or [`ErrorKind::Unexpected`].
pub fn kind_of(err: &(dyn StdError + 'static)) -> ErrorKind {
    find_tagged(err).map(Error::kind).unwrap_or_default()
}

/// Code of the first tagged error in the chain, or [`ErrorCode::UNKNOWN`].
pub fn code_of(err: &(dyn StdError + 'static)) -> ErrorCode {
    find_tagged(err)
        .map(|tagged| tagged.code().clone())
        .unwrap_or_default()
}
