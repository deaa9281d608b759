// Copyright (c) 2025 - Cowboy AI, Inc.
//! Command Deduplication
//!
//! Upstream transports deliver at least once, so the same stimulus can reach
//! an aggregate more than once. A deduplication strategy is built from recently
//! persisted events and answers one question: has a command with this
//! causation id already produced persisted effects?
//!
//! ```text
//! factory.new_builder() → add_event(e1) → add_event(e2) → build() → is_duplicate(causation)
//! ```
//!
//! The time-window strategy only remembers causations persisted within the
//! window (24 hours by default). Older causations are assumed unreachable
//! because the transport will not redeliver that far back. This gives at most
//! one set of side effects per causation inside the window, not a permanent
//! ledger.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::DeduplicationConfig;
use crate::domain::CausationId;
use crate::event_store::PersistedEvent;

/// Frozen, queryable deduplication state
pub trait CommandDeduplicationStrategy: Send + Sync {
    /// Whether a command with this causation id was already satisfied
    fn is_duplicate(&self, causation_id: &CausationId) -> bool;
}

/// Accumulates persisted events, then freezes into a strategy
pub trait CommandDeduplicationStrategyBuilder: Sized + Send {
    type Strategy: CommandDeduplicationStrategy;

    /// Record one persisted causation
    fn observe(&mut self, causation_id: &CausationId, timestamp: DateTime<Utc>);

    /// Record a persisted event
    fn add_event<E>(mut self, event: &PersistedEvent<E>) -> Self {
        self.observe(&event.causation_id, event.timestamp);
        self
    }

    /// Freeze the accumulated state
    fn build(self) -> Self::Strategy;
}

/// Creates a fresh builder per command dispatch
pub trait CommandDeduplicationStrategyFactory: Send + Sync {
    type Builder: CommandDeduplicationStrategyBuilder;

    fn new_builder(&self) -> Self::Builder;
}

/// Remembers causations persisted at or after a cutoff instant
#[derive(Debug, Clone, Default)]
pub struct TimeWindowDeduplicationStrategy {
    causations: HashSet<CausationId>,
}

impl TimeWindowDeduplicationStrategy {
    /// Number of remembered causations
    pub fn len(&self) -> usize {
        self.causations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.causations.is_empty()
    }
}

impl CommandDeduplicationStrategy for TimeWindowDeduplicationStrategy {
    fn is_duplicate(&self, causation_id: &CausationId) -> bool {
        self.causations.contains(causation_id)
    }
}

/// Builder for [`TimeWindowDeduplicationStrategy`]
#[derive(Debug, Clone)]
pub struct TimeWindowDeduplicationStrategyBuilder {
    cutoff: DateTime<Utc>,
    causations: HashSet<CausationId>,
}

impl TimeWindowDeduplicationStrategyBuilder {
    /// Only events timestamped at or after `cutoff` count
    pub fn with_cutoff(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            causations: HashSet::new(),
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }
}

impl CommandDeduplicationStrategyBuilder for TimeWindowDeduplicationStrategyBuilder {
    type Strategy = TimeWindowDeduplicationStrategy;

    fn observe(&mut self, causation_id: &CausationId, timestamp: DateTime<Utc>) {
        if timestamp >= self.cutoff {
            self.causations.insert(causation_id.clone());
        }
    }

    fn build(self) -> Self::Strategy {
        TimeWindowDeduplicationStrategy {
            causations: self.causations,
        }
    }
}

/// Factory for the time-window strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindowDeduplicationStrategyFactory {
    window: chrono::Duration,
}

impl Default for TimeWindowDeduplicationStrategyFactory {
    fn default() -> Self {
        Self::from_config(&DeduplicationConfig::default())
    }
}

impl TimeWindowDeduplicationStrategyFactory {
    pub fn new(window: chrono::Duration) -> Self {
        Self { window }
    }

    pub fn from_config(config: &DeduplicationConfig) -> Self {
        Self::new(config.window)
    }

    pub fn window(&self) -> chrono::Duration {
        self.window
    }
}

impl CommandDeduplicationStrategyFactory for TimeWindowDeduplicationStrategyFactory {
    type Builder = TimeWindowDeduplicationStrategyBuilder;

    /// A window reaching past the representable range covers all history
    fn new_builder(&self) -> Self::Builder {
        let cutoff = Utc::now()
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        TimeWindowDeduplicationStrategyBuilder::with_cutoff(cutoff)
    }
}
