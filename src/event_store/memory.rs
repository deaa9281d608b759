// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Event Store
//!
//! Reference [`EventStore`] implementation holding every aggregate log and the
//! global stream in process memory. A single mutex guards the logs together
//! with the offset counter, so the concurrency check, sequence assignment and
//! offset assignment of an append happen as one step. Events are serialised
//! before the lock is taken and the lock is never held across an `.await`.
//!
//! Timestamps are also assigned under the lock and strictly increase with the
//! offset, so an instant is as exact a resume position as an offset.
//!
//! Cloning the store shares the underlying log.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use super::{EventStore, PersistedEvent, SerialisationContentType, StreamEvent};
use crate::domain::{
    Aggregate, AggregateId, CausationId, CorrelationId, DomainEvent, DomainEventTag, EventId,
};
use crate::errors::{EventStoreError, EventStoreResult};

/// Aggregate logs are partitioned by aggregate type name and instance id
type StreamKey = (&'static str, AggregateId);

/// One event in an aggregate log, with its payload type-erased
struct StoredEvent {
    event_id: EventId,
    aggregate_id: AggregateId,
    causation_id: CausationId,
    correlation_id: Option<CorrelationId>,
    event_type: &'static str,
    event_version: u32,
    rust_type: &'static str,
    timestamp: DateTime<Utc>,
    sequence_number: u64,
    raw_event: Arc<dyn Any + Send + Sync>,
}

impl StoredEvent {
    fn to_persisted<A: Aggregate>(&self) -> EventStoreResult<PersistedEvent<A::Event>> {
        let raw_event = self
            .raw_event
            .downcast_ref::<A::Event>()
            .cloned()
            .ok_or_else(|| EventStoreError::EventTypeMismatch {
                event_id: self.event_id.to_string(),
                expected: std::any::type_name::<A::Event>(),
                found: self.rust_type.to_string(),
            })?;

        Ok(PersistedEvent {
            event_id: self.event_id.clone(),
            aggregate_type: A::NAME.to_string(),
            aggregate_id: self.aggregate_id.clone(),
            causation_id: self.causation_id.clone(),
            correlation_id: self.correlation_id.clone(),
            raw_event,
            event_type: self.event_type.to_string(),
            event_version: self.event_version,
            timestamp: self.timestamp,
            sequence_number: self.sequence_number,
        })
    }
}

#[derive(Default)]
struct Log {
    streams: HashMap<StreamKey, Vec<StoredEvent>>,
    global: Vec<StreamEvent>,
    last_offset: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Log {
    /// Wall-clock time, bumped past the previous event if the clock lags
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if now <= last => last
                .checked_add_signed(TimeDelta::nanoseconds(1))
                .unwrap_or(last),
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }
}

/// In-process event store
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<Mutex<Log>>,
}

impl fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryEventStore");
        if let Ok(log) = self.log.lock() {
            debug
                .field("aggregates", &log.streams.len())
                .field("events", &log.global.len())
                .field("last_offset", &log.last_offset);
        }
        debug.finish()
    }
}

impl InMemoryEventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> EventStoreResult<MutexGuard<'_, Log>> {
        self.log
            .lock()
            .map_err(|e| EventStoreError::Storage(format!("event log lock poisoned: {e}")))
    }

    /// Number of events currently held
    pub fn len(&self) -> EventStoreResult<usize> {
        Ok(self.lock()?.global.len())
    }

    /// Whether the store holds no events
    pub fn is_empty(&self) -> EventStoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Highest offset ever assigned (0 if nothing was ever appended)
    pub fn last_offset(&self) -> EventStoreResult<u64> {
        Ok(self.lock()?.last_offset)
    }

    /// Drop every event
    ///
    /// The offset counter and the clock are kept, so offsets are never reused
    /// and timestamps keep increasing.
    pub fn clear(&self) -> EventStoreResult<()> {
        let mut log = self.lock()?;
        log.streams.clear();
        log.global.clear();
        debug!(last_offset = log.last_offset, "event store cleared");
        Ok(())
    }

    fn read<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        after_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        let log = self.lock()?;
        let Some(stream) = log.streams.get(&(A::NAME, aggregate_id.clone())) else {
            return Ok(Vec::new());
        };

        stream
            .iter()
            .filter(|stored| stored.sequence_number > after_sequence_number)
            .map(StoredEvent::to_persisted::<A>)
            .collect()
    }

    fn append<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        causation_id: &CausationId,
        correlation_id: Option<&CorrelationId>,
        events: Vec<A::Event>,
        expected_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        let payloads = events
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()?;
        let key: StreamKey = (A::NAME, aggregate_id.clone());

        let mut log = self.lock()?;

        let actual = log
            .streams
            .get(&key)
            .and_then(|stream| stream.last())
            .map_or(0, |stored| stored.sequence_number);
        if actual != expected_sequence_number {
            return Err(EventStoreError::OptimisticConcurrency {
                aggregate_type: A::NAME.to_string(),
                aggregate_id: aggregate_id.clone(),
                expected: expected_sequence_number,
                actual,
            });
        }

        let first_offset = log.last_offset + 1;
        let mut persisted = Vec::with_capacity(events.len());
        let mut stored = Vec::with_capacity(events.len());
        let mut stream_events = Vec::with_capacity(events.len());

        for ((position, event), payload) in (1u64..).zip(events).zip(payloads) {
            let event_id = EventId::generate();
            let event_type = event.kind();
            let event_version = event.version();
            let sequence_number = expected_sequence_number + position;
            let offset = log.last_offset + position;
            let timestamp = log.next_timestamp();

            stream_events.push(StreamEvent {
                offset,
                id: event_id.clone(),
                aggregate_type: A::NAME.to_string(),
                aggregate_id: aggregate_id.clone(),
                causation_id: causation_id.clone(),
                correlation_id: correlation_id.cloned(),
                event_type: event_type.to_string(),
                event_version,
                event_tag: event.tag(),
                timestamp,
                sequence_number,
                serialised_payload: payload,
                payload_content_type: SerialisationContentType::Json,
            });
            stored.push(StoredEvent {
                event_id: event_id.clone(),
                aggregate_id: aggregate_id.clone(),
                causation_id: causation_id.clone(),
                correlation_id: correlation_id.cloned(),
                event_type,
                event_version,
                rust_type: std::any::type_name::<A::Event>(),
                timestamp,
                sequence_number,
                raw_event: Arc::new(event.clone()),
            });
            persisted.push(PersistedEvent {
                event_id,
                aggregate_type: A::NAME.to_string(),
                aggregate_id: aggregate_id.clone(),
                causation_id: causation_id.clone(),
                correlation_id: correlation_id.cloned(),
                raw_event: event,
                event_type: event_type.to_string(),
                event_version,
                timestamp,
                sequence_number,
            });
        }

        let count = persisted.len() as u64;
        log.last_offset += count;
        log.streams.entry(key).or_default().extend(stored);
        log.global.extend(stream_events);

        debug!(
            aggregate_type = A::NAME,
            aggregate_id = %aggregate_id,
            first_sequence = expected_sequence_number + 1,
            last_sequence = expected_sequence_number + count,
            first_offset,
            last_offset = log.last_offset,
            "appended events"
        );

        Ok(persisted)
    }

    fn stream_batch(
        &self,
        tag: &DomainEventTag,
        batch_size: usize,
        after_offset: u64,
        after_instant: Option<DateTime<Utc>>,
    ) -> EventStoreResult<Vec<StreamEvent>> {
        if batch_size == 0 {
            return Err(EventStoreError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let log = self.lock()?;
        let start = log.global.partition_point(|event| event.offset <= after_offset);

        Ok(log.global[start..]
            .iter()
            .filter(|event| &event.event_tag == tag)
            .filter(|event| after_instant.map_or(true, |after| event.timestamp > after))
            .take(batch_size)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn load_events<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        self.read::<A>(aggregate_id, 0)
    }

    async fn load_events_after<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        after_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        self.read::<A>(aggregate_id, after_sequence_number)
    }

    async fn save_events<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        causation_id: &CausationId,
        correlation_id: Option<&CorrelationId>,
        events: Vec<A::Event>,
        expected_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        self.append::<A>(
            aggregate_id,
            causation_id,
            correlation_id,
            events,
            expected_sequence_number,
        )
    }

    async fn save_events_and_state<A: Aggregate>(
        &self,
        aggregate_id: &AggregateId,
        causation_id: &CausationId,
        correlation_id: Option<&CorrelationId>,
        events: Vec<A::Event>,
        state: &A::State,
        expected_sequence_number: u64,
    ) -> EventStoreResult<Vec<PersistedEvent<A::Event>>> {
        debug!(
            aggregate_type = A::NAME,
            aggregate_id = %aggregate_id,
            ?state,
            "state snapshot offered but not persisted"
        );
        self.append::<A>(
            aggregate_id,
            causation_id,
            correlation_id,
            events,
            expected_sequence_number,
        )
    }

    async fn load_event_stream_after_offset(
        &self,
        tag: &DomainEventTag,
        after_offset: u64,
        batch_size: usize,
    ) -> EventStoreResult<Vec<StreamEvent>> {
        self.stream_batch(tag, batch_size, after_offset, None)
    }

    async fn load_event_stream_after_instant(
        &self,
        tag: &DomainEventTag,
        after: DateTime<Utc>,
        batch_size: usize,
    ) -> EventStoreResult<Vec<StreamEvent>> {
        self.stream_batch(tag, batch_size, 0, Some(after))
    }
}
