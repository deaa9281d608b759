// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bounded retry of optimistic concurrency conflicts
//!
//! Opt-in wrapper around [`AggregateRoot`]. Each attempt reloads and refolds
//! the history before deciding again, so a retry never reuses stale state.
//! Only `Concurrency` failures are retried; rejections, missing handlers and
//! store failures return immediately.

use backon::{BackoffBuilder, ExponentialBuilder};
use tracing::warn;

use super::{AggregateRoot, CommandEnvelope, CommandOutcome};
use crate::config::RetryConfig;
use crate::dedup::{CommandDeduplicationStrategyFactory, TimeWindowDeduplicationStrategyFactory};
use crate::domain::Aggregate;
use crate::errors::AggregateError;
use crate::event_store::EventStore;

/// Aggregate root that retries concurrency conflicts with exponential backoff
pub struct RetryingAggregateRoot<A, S, F = TimeWindowDeduplicationStrategyFactory> {
    root: AggregateRoot<A, S, F>,
    config: RetryConfig,
}

impl<A, S, F> RetryingAggregateRoot<A, S, F>
where
    A: Aggregate,
    S: EventStore,
    F: CommandDeduplicationStrategyFactory,
{
    pub fn new(root: AggregateRoot<A, S, F>, config: RetryConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &AggregateRoot<A, S, F> {
        &self.root
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.config.min_delay)
            .with_max_delay(self.config.max_delay)
            .with_max_times(self.config.max_attempts.saturating_sub(1));
        if self.config.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Handle a command, retrying up to `max_attempts` times in total
    ///
    /// Returns the last conflict if every attempt conflicts. A command whose
    /// causation was persisted by a racing writer comes back deduplicated.
    pub async fn handle(
        &self,
        envelope: CommandEnvelope<A::Command>,
    ) -> Result<CommandOutcome<A::Event>, AggregateError<A::Error>>
    where
        A::Command: Clone,
    {
        let mut backoff = self.backoff().build();
        let mut attempt = 1;

        loop {
            match self.root.handle(envelope.clone()).await {
                Err(err) if err.is_concurrency_conflict() && attempt < self.config.max_attempts => {
                    let delay = backoff.next().unwrap_or(self.config.max_delay);
                    warn!(
                        aggregate_type = A::NAME,
                        aggregate_id = %self.root.aggregate_id(),
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "concurrency conflict, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    pub async fn state(&self) -> Result<Option<A::State>, AggregateError<A::Error>> {
        self.root.state().await
    }
}
