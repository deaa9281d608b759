// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate Repository and Aggregate Root
//!
//! The aggregate root is the only component that writes to the event store.
//! Each [`AggregateRoot::handle`] call is one transaction:
//!
//! ```text
//! 1. Load history            store.load_events
//! 2. Fold                    initial behaviour → current behaviour, last sequence number
//! 3. Deduplicate             causation already persisted? → return previous events, no write
//! 4. Decide                  behaviour.handle_command → events | rejection (no write)
//! 5. Append                  store.save_events(expected = last sequence number)
//! 6. Return                  newly persisted events
//! ```
//!
//! A concurrency conflict in step 5 is returned to the caller, who may reload
//! and retry; [`RetryingAggregateRoot`] does that with bounded backoff.
//! No aggregate state is cached between calls.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::behaviour::{fold_events, Behaviour, CommandMetadata};
use crate::dedup::{
    CommandDeduplicationStrategy, CommandDeduplicationStrategyBuilder,
    CommandDeduplicationStrategyFactory, TimeWindowDeduplicationStrategyFactory,
};
use crate::domain::{
    Aggregate, AggregateId, CausationId, CommandId, CorrelationId, DomainCommand,
};
use crate::errors::AggregateError;
use crate::event_store::{EventStore, PersistedEvent};

mod retry;

pub use retry::RetryingAggregateRoot;

/// A command addressed to an aggregate, with its delivery identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope<C> {
    /// Unique per logical command instance
    pub command_id: CommandId,

    pub command: C,

    /// Upstream stimulus; stable across redeliveries
    pub causation_id: Option<CausationId>,

    /// Causal chain across aggregates
    pub correlation_id: Option<CorrelationId>,
}

impl<C> CommandEnvelope<C> {
    pub fn new(command_id: CommandId, command: C) -> Self {
        Self {
            command_id,
            command,
            causation_id: None,
            correlation_id: None,
        }
    }

    pub fn with_causation_id(mut self, causation_id: CausationId) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Causation id used for deduplication: the explicit one, or the command id
    pub fn effective_causation_id(&self) -> CausationId {
        self.causation_id
            .clone()
            .unwrap_or_else(|| CausationId::from(&self.command_id))
    }

    /// Metadata handed to the command handler
    pub fn metadata(&self, aggregate_id: AggregateId) -> CommandMetadata {
        let metadata = CommandMetadata::new(aggregate_id, self.command_id.clone())
            .with_causation_id(self.effective_causation_id());
        match &self.correlation_id {
            Some(correlation_id) => metadata.with_correlation_id(correlation_id.clone()),
            None => metadata,
        }
    }
}

/// Successful result of [`AggregateRoot::handle`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome<E> {
    /// The command was decided and these events were appended
    Persisted(Vec<PersistedEvent<E>>),

    /// The causation was already satisfied; these are the events it produced
    /// back then, and nothing was written
    Deduplicated(Vec<PersistedEvent<E>>),
}

impl<E> CommandOutcome<E> {
    pub fn events(&self) -> &[PersistedEvent<E>] {
        match self {
            CommandOutcome::Persisted(events) | CommandOutcome::Deduplicated(events) => events,
        }
    }

    pub fn into_events(self) -> Vec<PersistedEvent<E>> {
        match self {
            CommandOutcome::Persisted(events) | CommandOutcome::Deduplicated(events) => events,
        }
    }

    pub fn is_deduplicated(&self) -> bool {
        matches!(self, CommandOutcome::Deduplicated(_))
    }
}

/// Hands out aggregate roots for one aggregate type over a shared store
pub struct AggregateRepository<A, S, F = TimeWindowDeduplicationStrategyFactory> {
    store: Arc<S>,
    deduplication: Arc<F>,
    snapshots: bool,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, S, F> Clone for AggregateRepository<A, S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            deduplication: Arc::clone(&self.deduplication),
            snapshots: self.snapshots,
            _aggregate: PhantomData,
        }
    }
}

impl<A, S> AggregateRepository<A, S>
where
    A: Aggregate,
    S: EventStore,
{
    /// Repository with the default 24 hour deduplication window
    pub fn new(store: Arc<S>) -> Self {
        Self::with_deduplication(store, TimeWindowDeduplicationStrategyFactory::default())
    }
}

impl<A, S, F> AggregateRepository<A, S, F>
where
    A: Aggregate,
    S: EventStore,
    F: CommandDeduplicationStrategyFactory,
{
    pub fn with_deduplication(store: Arc<S>, deduplication: F) -> Self {
        Self {
            store,
            deduplication: Arc::new(deduplication),
            snapshots: false,
            _aggregate: PhantomData,
        }
    }

    /// Offer the post-command state to the store on every append
    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Root for one aggregate instance
    pub fn aggregate_root_of(&self, aggregate_id: AggregateId) -> AggregateRoot<A, S, F> {
        AggregateRoot {
            aggregate_id,
            store: Arc::clone(&self.store),
            deduplication: Arc::clone(&self.deduplication),
            snapshots: self.snapshots,
            _aggregate: PhantomData,
        }
    }
}

/// History and the behaviour folded from it
struct Loaded<A: Aggregate> {
    history: Vec<PersistedEvent<A::Event>>,
    behaviour: Behaviour<A>,
    last_sequence_number: u64,
}

/// Single entry point for commands against one aggregate instance
pub struct AggregateRoot<A, S, F = TimeWindowDeduplicationStrategyFactory> {
    aggregate_id: AggregateId,
    store: Arc<S>,
    deduplication: Arc<F>,
    snapshots: bool,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, S, F> Clone for AggregateRoot<A, S, F> {
    fn clone(&self) -> Self {
        Self {
            aggregate_id: self.aggregate_id.clone(),
            store: Arc::clone(&self.store),
            deduplication: Arc::clone(&self.deduplication),
            snapshots: self.snapshots,
            _aggregate: PhantomData,
        }
    }
}

impl<A, S, F> AggregateRoot<A, S, F>
where
    A: Aggregate,
    S: EventStore,
    F: CommandDeduplicationStrategyFactory,
{
    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    /// Handle one command
    ///
    /// # Errors
    ///
    /// - `NoHandlerForCommand` if the command is invalid in the current state
    /// - `NoHandlerForEvent` if the stored history or the decided events cannot
    ///   be folded
    /// - `Rejected` if the handler rejects the command
    /// - `Concurrency` if another writer appended since the history was loaded
    /// - `Store` for any other store failure
    ///
    /// Only a successful, non-deduplicated outcome writes to the store.
    pub async fn handle(
        &self,
        envelope: CommandEnvelope<A::Command>,
    ) -> Result<CommandOutcome<A::Event>, AggregateError<A::Error>> {
        let span = info_span!(
            "handle_command",
            aggregate_type = A::NAME,
            aggregate_id = %self.aggregate_id,
            command_id = %envelope.command_id,
            command_kind = envelope.command.kind(),
        );
        self.handle_in_span(envelope).instrument(span).await
    }

    async fn handle_in_span(
        &self,
        envelope: CommandEnvelope<A::Command>,
    ) -> Result<CommandOutcome<A::Event>, AggregateError<A::Error>> {
        let Loaded {
            history,
            behaviour,
            last_sequence_number,
        } = self.load().await?;

        let metadata = envelope.metadata(self.aggregate_id.clone());
        let strategy = history
            .iter()
            .fold(self.deduplication.new_builder(), |builder, event| {
                builder.add_event(event)
            })
            .build();

        if strategy.is_duplicate(&metadata.causation_id) {
            let previous: Vec<_> = history
                .into_iter()
                .filter(|event| event.causation_id == metadata.causation_id)
                .collect();
            info!(
                causation_id = %metadata.causation_id,
                previous_events = previous.len(),
                "causation already satisfied, skipping command"
            );
            return Ok(CommandOutcome::Deduplicated(previous));
        }

        let events = behaviour
            .handle_command(&envelope.command, &metadata)
            .map_err(|err| {
                warn!(error = %err, "command rejected");
                AggregateError::from(err)
            })?;

        if events.is_empty() {
            debug!("command produced no events");
            return Ok(CommandOutcome::Persisted(Vec::new()));
        }

        // Events the behaviour cannot apply would break every later replay
        let next = fold_events(behaviour, &events).map_err(|err| {
            warn!(error = %err, "command produced an event its behaviour cannot apply");
            AggregateError::from(err)
        })?;

        let saved = if self.snapshots {
            self.store
                .save_events_and_state::<A>(
                    &self.aggregate_id,
                    &metadata.causation_id,
                    metadata.correlation_id.as_ref(),
                    events,
                    next.state(),
                    last_sequence_number,
                )
                .await
        } else {
            self.store
                .save_events::<A>(
                    &self.aggregate_id,
                    &metadata.causation_id,
                    metadata.correlation_id.as_ref(),
                    events,
                    last_sequence_number,
                )
                .await
        };

        let persisted = saved.map_err(|err| {
            if err.is_concurrency_conflict() {
                warn!(
                    expected_sequence_number = last_sequence_number,
                    error = %err,
                    "concurrency conflict"
                );
            }
            AggregateError::from(err)
        })?;

        info!(
            persisted_events = persisted.len(),
            last_sequence_number = persisted.last().map_or(last_sequence_number, |e| e.sequence_number),
            "command handled"
        );
        Ok(CommandOutcome::Persisted(persisted))
    }

    /// Current state, or `None` if the aggregate has no events
    pub async fn state(&self) -> Result<Option<A::State>, AggregateError<A::Error>> {
        let loaded = self.load().await?;
        if loaded.history.is_empty() {
            return Ok(None);
        }
        Ok(Some(loaded.behaviour.state().clone()))
    }

    /// Current behaviour folded from the full history
    pub async fn behaviour(&self) -> Result<Behaviour<A>, AggregateError<A::Error>> {
        Ok(self.load().await?.behaviour)
    }

    /// Wrap this root in a bounded retry of concurrency conflicts
    pub fn retrying(self, config: crate::config::RetryConfig) -> RetryingAggregateRoot<A, S, F> {
        RetryingAggregateRoot::new(self, config)
    }

    async fn load(&self) -> Result<Loaded<A>, AggregateError<A::Error>> {
        let history = self.store.load_events::<A>(&self.aggregate_id).await?;
        let last_sequence_number = history.last().map_or(0, |event| event.sequence_number);
        debug!(
            aggregate_type = A::NAME,
            aggregate_id = %self.aggregate_id,
            events = history.len(),
            last_sequence_number,
            "loaded history"
        );

        let behaviour = fold_events(
            A::initial_behaviour(),
            history.iter().map(|event| &event.raw_event),
        )?;

        Ok(Loaded {
            history,
            behaviour,
            last_sequence_number,
        })
    }
}
