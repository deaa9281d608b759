// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command Context
//!
//! What a command handler sees besides the command itself: read access to the
//! current state, the identifiers of the command being handled, and a place to
//! stage domain validation failures before events are returned.

use crate::domain::{Aggregate, AggregateId, CausationId, CommandId, CorrelationId};

/// Identifiers describing the command being handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// Target aggregate instance
    pub aggregate_id: AggregateId,

    /// Unique id of this command instance
    pub command_id: CommandId,

    /// Upstream stimulus, or the command id when there is none
    pub causation_id: CausationId,

    /// Causal chain across aggregates
    pub correlation_id: Option<CorrelationId>,
}

impl CommandMetadata {
    /// Metadata for a command with no upstream stimulus
    pub fn new(aggregate_id: AggregateId, command_id: CommandId) -> Self {
        let causation_id = CausationId::from(&command_id);
        Self {
            aggregate_id,
            command_id,
            causation_id,
            correlation_id: None,
        }
    }

    /// Set the causation id
    pub fn with_causation_id(mut self, causation_id: CausationId) -> Self {
        self.causation_id = causation_id;
        self
    }

    /// Set the correlation id
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Context passed to a command handler
pub struct CommandContext<'a, A: Aggregate> {
    state: &'a A::State,
    metadata: &'a CommandMetadata,
    staged: Vec<A::Error>,
}

impl<'a, A: Aggregate> CommandContext<'a, A> {
    pub(crate) fn new(state: &'a A::State, metadata: &'a CommandMetadata) -> Self {
        Self {
            state,
            metadata,
            staged: Vec::new(),
        }
    }

    /// Current materialised state
    pub fn state(&self) -> &A::State {
        self.state
    }

    /// Identifiers of the command being handled
    pub fn metadata(&self) -> &CommandMetadata {
        self.metadata
    }

    /// Target aggregate instance
    pub fn aggregate_id(&self) -> &AggregateId {
        &self.metadata.aggregate_id
    }

    /// Stage a condition; if it does not hold the command is rejected with
    /// the error, even when the handler itself returns events
    pub fn require(&mut self, condition: bool, error: impl FnOnce() -> A::Error) -> &mut Self {
        if !condition {
            self.staged.push(error());
        }
        self
    }

    /// Stage an unconditional rejection
    pub fn reject(&mut self, error: A::Error) -> &mut Self {
        self.staged.push(error);
        self
    }

    /// Whether any staged condition has failed so far
    pub fn has_failures(&self) -> bool {
        !self.staged.is_empty()
    }

    /// First staged failure, in staging order
    pub(crate) fn into_first_failure(self) -> Option<A::Error> {
        self.staged.into_iter().next()
    }
}
