// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Store Abstraction
//!
//! Append-only storage for aggregate histories with two read models:
//!
//! ```text
//! Aggregate Root → save_events → per-aggregate log (sequence numbers 1, 2, 3, ...)
//!                                      ↓
//!                               global tagged stream (offsets, store-wide)
//!                                      ↓
//!                                 Projections
//! ```
//!
//! # Event Store Requirements
//!
//! 1. **Append-Only**: persisted events are never updated
//! 2. **Gapless Sequencing**: per aggregate, sequence numbers start at 1 and
//!    have no gaps
//! 3. **Optimistic Concurrency**: an append fails entirely unless the
//!    aggregate's last sequence number equals the expected one
//! 4. **Global Ordering**: every persisted event gets exactly one offset from a
//!    single store-wide counter, never reused
//! 5. **Resumable Streams**: consumers poll by tag with an offset or instant
//!    cursor
//!
//! # Example
//!
//! ```rust,ignore
//! use cim_event_sourcing::event_store::{EventStore, InMemoryEventStore};
//!
//! let store = InMemoryEventStore::new();
//! let persisted = store
//!     .save_events::<User>(&aggregate_id, &causation_id, None, events, 0)
//!     .await?;
//! let history = store.load_events::<User>(&aggregate_id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Aggregate, AggregateId, CausationId, CorrelationId, DomainEventTag, EventId,
};
use crate::errors::EventStoreResult;

pub mod memory;

pub use memory::InMemoryEventStore;

/// An event as persisted in one aggregate's log
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedEvent<E> {
    /// Unique event identifier
    pub event_id: EventId,

    /// Aggregate type name (partition key)
    pub aggregate_type: String,

    /// Aggregate instance the event belongs to
    pub aggregate_id: AggregateId,

    /// Upstream stimulus of the command that produced the event
    pub causation_id: CausationId,

    /// Causal chain across aggregates
    pub correlation_id: Option<CorrelationId>,

    /// The domain event itself
    pub raw_event: E,

    /// Concrete event kind
    pub event_type: String,

    /// Schema version of the payload, from [`DomainEvent::version`]
    ///
    /// [`DomainEvent::version`]: crate::domain::DomainEvent::version
    pub event_version: u32,

    /// Time of append, strictly increasing with the global offset
    pub timestamp: DateTime<Utc>,

    /// Position in the aggregate's log, starting at 1
    pub sequence_number: u64,
}

/// Content type of [`StreamEvent::serialised_payload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerialisationContentType {
    /// UTF-8 JSON document
    Json,
}

impl SerialisationContentType {
    /// MIME type
    pub fn mime_type(&self) -> &'static str {
        match self {
            SerialisationContentType::Json => "application/json",
        }
    }
}

/// A persisted event on the global, cross-aggregate stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Store-wide position, strictly increasing
    pub offset: u64,

    /// Event identifier
    pub id: EventId,

    pub aggregate_type: String,
    pub aggregate_id: AggregateId,
    pub causation_id: CausationId,
    pub correlation_id: Option<CorrelationId>,
    pub event_type: String,
    pub event_version: u32,
    pub event_tag: DomainEventTag,
    pub timestamp: DateTime<Utc>,
    pub sequence_number: u64,

    /// Serialised domain event
    pub serialised_payload: Vec<u8>,

    /// Encoding of `serialised_payload`
    pub payload_content_type: SerialisationContentType,
}

impl StreamEvent {
    /// Decode the payload as a JSON value
    pub fn payload_json(&self) -> EventStoreResult<serde_json::Value> {
        match self.payload_content_type {
            SerialisationContentType::Json => Ok(serde_json::from_slice(&self.serialised_payload)?),
        }
    }
}

/// Event Store trait for aggregate histories and the global stream
///
/// Implementations must make the concurrency check, sequence assignment and
/// offset assignment of one append indivisible. Different aggregate instances
/// never block each other beyond that critical section.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Load the full history of an aggregate, ordered by sequence number
    ///
    /// Returns an empty vector for an aggregate with no events.
    async fn load_events<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>>;

    /// Load the events of an aggregate with a sequence number strictly greater
    /// than `after_sequence_number`
    async fn load_events_after<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        after_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>>;

    /// Append events atomically under optimistic concurrency
    ///
    /// Assigns sequence numbers `expected_sequence_number + 1 ..` in order and
    /// one global offset per event.
    ///
    /// # Errors
    ///
    /// - `OptimisticConcurrency` if the aggregate's last sequence number
    ///   (0 when empty) differs from `expected_sequence_number`; nothing is
    ///   appended
    /// - `Serialization` if an event cannot be encoded for the stream
    /// - `Storage` if the backend fails
    async fn save_events<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        causation_id: &CausationId,
        correlation_id: Option<&CorrelationId>,
        events: Vec<A::Event>,
        expected_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>>;

    /// Same as [`EventStore::save_events`], additionally offering a state
    /// snapshot
    ///
    /// Backends without snapshot support may ignore `state`.
    async fn save_events_and_state<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        causation_id: &CausationId,
        correlation_id: Option<&CorrelationId>,
        events: Vec<A::Event>,
        state: &A::State,
        expected_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>>;

    /// Up to `batch_size` stream events with this tag and an offset strictly
    /// greater than `after_offset`, ordered by offset
    ///
    /// `after_offset = 0` reads from the beginning.
    async fn load_event_stream_after_offset(
        &self,
        tag: &DomainEventTag,
        after_offset: u64,
        batch_size: usize,
    ) -> EventStoreResult<Vec<StreamEvent>>;

    /// Up to `batch_size` stream events with this tag and a timestamp strictly
    /// after `after`, ordered by offset
    ///
    /// Timestamps must strictly increase with the offset, so the timestamp of
    /// the last event returned is an exact resume position.
    async fn load_event_stream_after_instant(
        &self,
        tag: &DomainEventTag,
        after: DateTime<Utc>,
        batch_size: usize,
    ) -> EventStoreResult<Vec<StreamEvent>>;
}
