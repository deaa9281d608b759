// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Event Store and Aggregate Root
//!
//! Async store calls are driven with `tokio_test::block_on`; every case uses
//! a fresh in-memory store.

use std::sync::Arc;

use cim_event_sourcing::{
    AggregateId, AggregateRepository, CausationId, EventStore, InMemoryEventStore,
};
use proptest::prelude::*;
use tokio_test::block_on;

use crate::fixtures::*;

/// Password changes only, so any batch can follow a registration
fn change_batch(size: usize, batch: usize) -> Vec<UserEvent> {
    (0..size)
        .map(|n| password_changed(&format!("pw-{batch}-{n}")))
        .collect()
}

proptest! {
    /// Property: Monotonic sequencing
    ///
    /// Appending batches of k events with the correct expected sequence
    /// number yields exactly n+1 ..= n+k for every batch, with no gaps.
    #[test]
    fn prop_sequence_numbers_are_gapless(batch_sizes in prop::collection::vec(1usize..6, 1..12)) {
        let store = InMemoryEventStore::new();
        let id = user_id();
        let mut expected = 0u64;

        block_on(store.save_events::<User>(&id, &CausationId::new("register"), None, vec![user_registered(USERNAME)], 0)).unwrap();
        expected += 1;

        for (batch, size) in batch_sizes.iter().enumerate() {
            let persisted = block_on(store.save_events::<User>(
                &id,
                &CausationId::new(format!("batch-{batch}")),
                None,
                change_batch(*size, batch),
                expected,
            ))
            .unwrap();

            let sequences: Vec<u64> = persisted.iter().map(|e| e.sequence_number).collect();
            let wanted: Vec<u64> = (expected + 1..=expected + *size as u64).collect();
            prop_assert_eq!(sequences, wanted);
            expected += *size as u64;
        }

        let history = block_on(store.load_events::<User>(&id)).unwrap();
        let all: Vec<u64> = history.iter().map(|e| e.sequence_number).collect();
        prop_assert_eq!(all, (1..=expected).collect::<Vec<_>>());
    }

    /// Property: Global ordering
    ///
    /// Whatever the interleaving of aggregates, offsets follow append order
    /// and are strictly increasing.
    #[test]
    fn prop_offsets_follow_append_order(writers in prop::collection::vec(0usize..4, 1..40)) {
        let store = InMemoryEventStore::new();
        let mut last_sequence = [0u64; 4];
        let mut appended = Vec::new();

        for (n, writer) in writers.iter().enumerate() {
            let id = AggregateId::new(format!("user-{writer}"));
            let event = if last_sequence[*writer] == 0 {
                user_registered(&format!("name-{writer}"))
            } else {
                password_changed(&format!("pw-{n}"))
            };
            let persisted = block_on(store.save_events::<User>(
                &id,
                &CausationId::new(format!("msg-{n}")),
                None,
                vec![event],
                last_sequence[*writer],
            ))
            .unwrap();
            last_sequence[*writer] += 1;
            appended.push(persisted[0].event_id.clone());
        }

        let stream = block_on(store.load_event_stream_after_offset(&user_tag(), 0, writers.len())).unwrap();
        let ids: Vec<_> = stream.iter().map(|e| e.id.clone()).collect();
        prop_assert_eq!(ids, appended);
        prop_assert!(stream.windows(2).all(|pair| pair[0].offset < pair[1].offset));
    }

    /// Property: Concurrency safety
    ///
    /// Of two appends with the same expected sequence number, only the first
    /// lands and the history holds only its events.
    #[test]
    fn prop_stale_append_is_rejected(prior in 0usize..5, first in 1usize..4, second in 1usize..4) {
        let store = InMemoryEventStore::new();
        let id = user_id();
        block_on(store.save_events::<User>(&id, &CausationId::new("register"), None, vec![user_registered(USERNAME)], 0)).unwrap();
        if prior > 0 {
            block_on(store.save_events::<User>(&id, &CausationId::new("prior"), None, change_batch(prior, 0), 1)).unwrap();
        }
        let expected = 1 + prior as u64;

        let winner = block_on(store.save_events::<User>(&id, &CausationId::new("a"), None, change_batch(first, 1), expected)).unwrap();
        let loser = block_on(store.save_events::<User>(&id, &CausationId::new("b"), None, change_batch(second, 2), expected));

        prop_assert!(loser.unwrap_err().is_concurrency_conflict());
        let history = block_on(store.load_events::<User>(&id)).unwrap();
        prop_assert_eq!(history.len() as u64, expected + first as u64);
        prop_assert_eq!(&history[expected as usize..], &winner[..]);
    }

    /// Property: Deduplication idempotence
    ///
    /// Any number of redeliveries of one envelope produce events only once.
    #[test]
    fn prop_redelivery_appends_once(redeliveries in 1usize..8) {
        let store = Arc::new(InMemoryEventStore::new());
        let repository: AggregateRepository<User, _> = AggregateRepository::new(Arc::clone(&store));
        let root = repository.aggregate_root_of(user_id());

        let original = block_on(root.handle(register_alice("msg-1"))).unwrap();
        for _ in 0..redeliveries {
            let outcome = block_on(root.handle(register_alice("msg-1"))).unwrap();
            prop_assert!(outcome.is_deduplicated());
            prop_assert_eq!(outcome.events(), original.events());
        }

        prop_assert_eq!(store.len().unwrap(), 1);
    }
}
