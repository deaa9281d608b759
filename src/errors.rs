// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for event sourcing operations
//!
//! Failures are values, never panics. Callers pattern-match on these types to
//! separate recoverable outcomes (concurrency conflicts, store I/O) from
//! non-recoverable ones (missing handlers, domain rejections).

use thiserror::Error;

use crate::domain::AggregateId;

/// The current behaviour has no handler for the command's concrete kind
///
/// Signals an operation that is invalid for the aggregate's current lifecycle
/// state. Never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the current behaviour of {aggregate_type} does not handle the command {command_kind}")]
pub struct NoHandlerForCommand {
    /// Aggregate type name
    pub aggregate_type: &'static str,

    /// Concrete command kind that was dispatched
    pub command_kind: &'static str,
}

/// A persisted event kind has no fold handler in the current behaviour
///
/// Fatal for replay of that aggregate: the history is corrupted or the code is
/// missing a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the current behaviour of {aggregate_type} does not handle the event {event_kind}")]
pub struct NoHandlerForEvent {
    /// Aggregate type name
    pub aggregate_type: &'static str,

    /// Concrete event kind that was folded
    pub event_kind: &'static str,
}

/// Failure of a single command dispatch against a behaviour
#[derive(Debug, Error)]
pub enum CommandError<E>
where
    E: std::error::Error + 'static,
{
    /// No handler for this command kind in the current state
    #[error(transparent)]
    NoHandler(#[from] NoHandlerForCommand),

    /// The handler rejected the command
    #[error("command rejected: {0}")]
    Rejected(#[source] E),
}

/// Errors raised by event store implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventStoreError {
    /// Another writer appended since the caller loaded the aggregate
    #[error(
        "optimistic concurrency conflict on {aggregate_type}/{aggregate_id}: \
         expected sequence number {expected}, found {actual}"
    )]
    OptimisticConcurrency {
        aggregate_type: String,
        aggregate_id: AggregateId,
        expected: u64,
        actual: u64,
    },

    /// Event payload could not be serialised
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored event does not belong to the requested aggregate type
    #[error("stored event {event_id} has type {found}, expected {expected}")]
    EventTypeMismatch {
        event_id: String,
        expected: &'static str,
        found: String,
    },

    /// Caller supplied an argument the store cannot honour
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backend failure (timeout, connectivity, poisoned lock)
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for event store operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

impl EventStoreError {
    /// Whether this is an optimistic concurrency violation
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, EventStoreError::OptimisticConcurrency { .. })
    }
}

impl From<serde_json::Error> for EventStoreError {
    fn from(err: serde_json::Error) -> Self {
        EventStoreError::Serialization(err.to_string())
    }
}

/// Errors returned to callers of an aggregate root
///
/// `handle()` yields either the persisted events or exactly one of these.
#[derive(Debug, Error)]
pub enum AggregateError<E>
where
    E: std::error::Error + 'static,
{
    /// Command is not valid in the aggregate's current lifecycle state
    #[error(transparent)]
    NoHandlerForCommand(#[from] NoHandlerForCommand),

    /// History contains an event the behaviour cannot fold
    #[error(transparent)]
    NoHandlerForEvent(#[from] NoHandlerForEvent),

    /// Business rule violation reported by the command handler
    #[error("command rejected: {0}")]
    Rejected(#[source] E),

    /// Stale expected sequence number; reload and retry
    #[error(
        "concurrency conflict on {aggregate_type}/{aggregate_id}: \
         expected sequence number {expected}, found {actual}"
    )]
    Concurrency {
        aggregate_type: String,
        aggregate_id: AggregateId,
        expected: u64,
        actual: u64,
    },

    /// Any other backend failure
    #[error("event store error: {0}")]
    Store(#[source] EventStoreError),
}

impl<E> AggregateError<E>
where
    E: std::error::Error + 'static,
{
    /// Whether a reload-and-retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AggregateError::Concurrency { .. } | AggregateError::Store(_)
        )
    }

    /// Whether this is an optimistic concurrency conflict
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, AggregateError::Concurrency { .. })
    }
}

impl<E> From<EventStoreError> for AggregateError<E>
where
    E: std::error::Error + 'static,
{
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::OptimisticConcurrency {
                aggregate_type,
                aggregate_id,
                expected,
                actual,
            } => AggregateError::Concurrency {
                aggregate_type,
                aggregate_id,
                expected,
                actual,
            },
            other => AggregateError::Store(other),
        }
    }
}

impl<E> From<CommandError<E>> for AggregateError<E>
where
    E: std::error::Error + 'static,
{
    fn from(err: CommandError<E>) -> Self {
        match err {
            CommandError::NoHandler(no_handler) => AggregateError::NoHandlerForCommand(no_handler),
            CommandError::Rejected(cause) => AggregateError::Rejected(cause),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Environment variable holds a value that does not parse
    #[error("Configuration error: {key}={value} is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Value parses but is outside the accepted range
    #[error("Configuration error: {0}")]
    OutOfRange(String),
}
