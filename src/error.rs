use crate::application::status::ActorRole;
use crate::domain::invariant::Violation;
use crate::domain::task::{TaskName, TaskStatus};
use derive_more::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Store concurrency harness error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Target task '{name}' not found")]
    TargetNotFound { name: TaskName },

    #[error("Task name '{name}' already exists")]
    DuplicateName { name: TaskName },

    #[error("Write anomaly on '{name}' setting {status}: expected 1 modified document, got {modified}")]
    WriteAnomaly {
        name: TaskName,
        status: TaskStatus,
        modified: u64,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(Violation),

    #[error("{actor} failed: {source}")]
    Actor {
        actor: ActorRole,
        #[source]
        source: Arc<Error>,
    },

    #[error("{actor} panicked: {message}")]
    ActorPanicked { actor: ActorRole, message: String },

    #[error("Untracked task {task} panicked: {message}")]
    UntrackedPanic { task: String, message: String },

    #[error("Run timed out after {0:?}")]
    RunTimedOut(Duration),
}

/// Coarse classification of failures, used when reporting a verdict
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("lookup failure")]
    LookupFailure,
    #[display("write anomaly")]
    WriteAnomaly,
    #[display("invariant violation")]
    InvariantViolation,
    #[display("transport error")]
    TransportError,
    #[display("configuration error")]
    Configuration,
    #[display("actor panic")]
    ActorPanic,
    #[display("timeout")]
    Timeout,
}

impl Error {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn actor(actor: ActorRole, source: Arc<Error>) -> Self {
        Self::Actor { actor, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::InvalidInput { .. } => ErrorKind::Configuration,
            Error::Database(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Store { .. }
            | Error::DuplicateName { .. } => ErrorKind::TransportError,
            Error::TargetNotFound { .. } => ErrorKind::LookupFailure,
            Error::WriteAnomaly { .. } => ErrorKind::WriteAnomaly,
            Error::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Error::Actor { source, .. } => source.kind(),
            Error::ActorPanicked { .. } | Error::UntrackedPanic { .. } => ErrorKind::ActorPanic,
            Error::RunTimedOut(_) => ErrorKind::Timeout,
        }
    }

    /// The actor a failure is attributed to, if any
    pub fn actor_role(&self) -> Option<ActorRole> {
        match self {
            Error::Actor { actor, .. } | Error::ActorPanicked { actor, .. } => Some(*actor),
            _ => None,
        }
    }

    /// The invariant violation behind this error, looking through actor wrapping
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::InvariantViolation(violation) => Some(violation),
            Error::Actor { source, .. } => source.violation(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
