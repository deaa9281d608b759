//! Event sourcing substrate for the Composable Information Machine
//!
//! Aggregate state is derived entirely from an append-only event log, and
//! commands are handled safely under concurrent access:
//!
//! - [`behaviour`] - immutable state machine turning commands into events and
//!   folding events into the next behaviour
//! - [`event_store`] - per-aggregate logs with optimistic concurrency plus a
//!   global tagged stream
//! - [`dedup`] - causation-based command deduplication over a time window
//! - [`repository`] - aggregate roots orchestrating load, fold, dedup, decide
//!   and append
//! - [`stream`] - resumable stream consumption for projections

pub mod behaviour;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod event_store;
pub mod repository;
pub mod stream;

// Re-export commonly used types
pub use behaviour::{fold_events, Behaviour, BehaviourBuilder, CommandContext, CommandMetadata};
pub use config::{DeduplicationConfig, RetryConfig, StreamConfig};
pub use dedup::{
    CommandDeduplicationStrategy, CommandDeduplicationStrategyBuilder,
    CommandDeduplicationStrategyFactory, TimeWindowDeduplicationStrategyFactory,
};
pub use domain::{
    Aggregate, AggregateId, CausationId, CommandId, CorrelationId, DomainCommand, DomainEvent,
    DomainEventTag, EventId, Variant,
};
pub use errors::{
    AggregateError, CommandError, ConfigError, EventStoreError, EventStoreResult,
    NoHandlerForCommand, NoHandlerForEvent,
};
pub use event_store::{
    EventStore, InMemoryEventStore, PersistedEvent, SerialisationContentType, StreamEvent,
};
pub use repository::{
    AggregateRepository, AggregateRoot, CommandEnvelope, CommandOutcome, RetryingAggregateRoot,
};
pub use stream::{EventStreamReader, StreamCursor};
