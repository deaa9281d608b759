// Copyright (c) 2025 - Cowboy AI, Inc.
//! Global Stream Consumption
//!
//! [`EventStreamReader`] is what a projector uses to follow one tag on the
//! global stream. It polls the store in batches and advances a resumable
//! cursor after each non-empty batch.
//!
//! Two cursor styles:
//!
//! - [`StreamCursor::Offset`] resumes exactly after the last offset seen
//! - [`StreamCursor::Instant`] resumes after the last timestamp seen, which
//!   suits consumers that only know when they last looked. Stores assign
//!   timestamps that strictly increase with the offset, so nothing between two
//!   batches is skipped.
//!
//! ```rust,ignore
//! let mut reader = EventStreamReader::from_beginning(store, DomainEventTag::new("user"));
//! loop {
//!     let batch = reader.next_batch().await?;
//!     if batch.is_empty() { break; }
//!     for event in batch { project(event)?; }
//!     save_checkpoint(reader.cursor())?;
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StreamConfig;
use crate::domain::DomainEventTag;
use crate::errors::{EventStoreError, EventStoreResult};
use crate::event_store::{EventStore, StreamEvent};

/// Resume position on the global stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCursor {
    /// Everything with an offset greater than this; 0 is the beginning
    Offset(u64),

    /// Everything timestamped after this instant
    Instant(DateTime<Utc>),
}

impl StreamCursor {
    pub fn beginning() -> Self {
        StreamCursor::Offset(0)
    }

    /// Cursor positioned after the last event of a batch
    fn advanced_past(self, event: &StreamEvent) -> Self {
        match self {
            StreamCursor::Offset(_) => StreamCursor::Offset(event.offset),
            StreamCursor::Instant(_) => StreamCursor::Instant(event.timestamp),
        }
    }
}

/// Tag-scoped, resumable poller over an [`EventStore`]
pub struct EventStreamReader<S> {
    store: Arc<S>,
    tag: DomainEventTag,
    cursor: StreamCursor,
    batch_size: usize,
}

impl<S: EventStore> EventStreamReader<S> {
    pub fn new(store: Arc<S>, tag: DomainEventTag, cursor: StreamCursor) -> Self {
        Self::with_config(store, tag, cursor, &StreamConfig::default())
    }

    pub fn with_config(
        store: Arc<S>,
        tag: DomainEventTag,
        cursor: StreamCursor,
        config: &StreamConfig,
    ) -> Self {
        Self {
            store,
            tag,
            cursor,
            batch_size: config.batch_size,
        }
    }

    pub fn from_beginning(store: Arc<S>, tag: DomainEventTag) -> Self {
        Self::new(store, tag, StreamCursor::beginning())
    }

    pub fn cursor(&self) -> StreamCursor {
        self.cursor
    }

    pub fn tag(&self) -> &DomainEventTag {
        &self.tag
    }

    /// Fetch the next batch and advance the cursor past it
    ///
    /// An empty batch means the reader has caught up; the cursor is unchanged.
    pub async fn next_batch(&mut self) -> EventStoreResult<Vec<StreamEvent>> {
        let batch = match self.cursor {
            StreamCursor::Offset(after) => {
                self.store
                    .load_event_stream_after_offset(&self.tag, after, self.batch_size)
                    .await?
            }
            StreamCursor::Instant(after) => {
                self.store
                    .load_event_stream_after_instant(&self.tag, after, self.batch_size)
                    .await?
            }
        };

        if let Some(last) = batch.last() {
            self.cursor = self.cursor.advanced_past(last);
        }
        debug!(
            tag = %self.tag,
            events = batch.len(),
            cursor = ?self.cursor,
            "read stream batch"
        );
        Ok(batch)
    }

    /// Read batches until caught up
    pub async fn catch_up(&mut self) -> EventStoreResult<Vec<StreamEvent>> {
        let mut events = Vec::new();
        loop {
            let batch = self.next_batch().await?;
            if batch.is_empty() {
                return Ok(events);
            }
            events.extend(batch);
        }
    }

    /// Events one at a time until caught up, then the stream ends
    pub fn into_stream(self) -> impl Stream<Item = EventStoreResult<StreamEvent>> + Send {
        stream::try_unfold(self, |mut reader| async move {
            let batch = reader.next_batch().await?;
            if batch.is_empty() {
                return Ok::<_, EventStoreError>(None);
            }
            let events = stream::iter(batch.into_iter().map(Ok::<_, EventStoreError>));
            Ok(Some((events, reader)))
        })
        .try_flatten()
    }
}
