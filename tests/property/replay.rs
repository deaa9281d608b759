// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Behaviour Replay
//!
//! Folding a history must be a pure function of that history, and a history
//! the behaviour cannot fold must fail instead of being skipped.

use cim_event_sourcing::{Aggregate, Behaviour, NoHandlerForEvent};
use proptest::prelude::*;

use crate::fixtures::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn password() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

/// A history the user aggregate accepts: one registration, then password changes
fn valid_history() -> impl Strategy<Value = Vec<UserEvent>> {
    ("[a-z]{1,8}", prop::collection::vec(password(), 0..30)).prop_map(|(username, passwords)| {
        std::iter::once(user_registered(&username))
            .chain(passwords.iter().map(|p| password_changed(p)))
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Replay is deterministic
    ///
    /// The same history folded any number of times yields the same state and
    /// the same active handler set.
    #[test]
    fn prop_replay_is_deterministic(history in valid_history(), runs in 2usize..5) {
        let first = Behaviour::<User>::replay(&history).unwrap();

        for _ in 1..runs {
            let again = Behaviour::<User>::replay(&history).unwrap();
            prop_assert_eq!(again.state(), first.state());
            prop_assert_eq!(again.command_kinds(), first.command_kinds());
        }
    }

    /// Property: Every event is folded exactly once, in order
    #[test]
    fn prop_replay_applies_every_event(history in valid_history()) {
        let behaviour = Behaviour::<User>::replay(&history).unwrap();
        let state = behaviour.state();

        prop_assert_eq!(state.password_changes as usize, history.len() - 1);
        let expected_password = match history.last() {
            Some(UserEvent::PasswordChanged(changed)) => changed.password.clone(),
            _ => PASSWORD.to_string(),
        };
        prop_assert_eq!(&state.password, &expected_password);
    }

    /// Property: Replay can be split at any point
    ///
    /// Folding a prefix and then the suffix equals folding the whole history.
    #[test]
    fn prop_replay_is_resumable(history in valid_history(), split in any::<prop::sample::Index>()) {
        let at = split.index(history.len() + 1);
        let (prefix, suffix) = history.split_at(at);

        let partial = Behaviour::<User>::replay(prefix).unwrap();
        let resumed = cim_event_sourcing::fold_events(partial, suffix).unwrap();
        let whole = Behaviour::<User>::replay(&history).unwrap();

        prop_assert_eq!(resumed.state(), whole.state());
    }

    /// Property: Replay fails closed
    ///
    /// A password change before registration has no handler in the initial
    /// behaviour, wherever the rest of the history goes.
    #[test]
    fn prop_unregistered_password_change_fails(history in valid_history(), pw in password()) {
        let mut corrupted = vec![password_changed(&pw)];
        corrupted.extend(history);

        let err = Behaviour::<User>::replay(&corrupted).unwrap_err();
        prop_assert_eq!(err, NoHandlerForEvent {
            aggregate_type: User::NAME,
            event_kind: "PasswordChanged",
        });
    }

    /// Property: A second registration anywhere in the history fails replay
    #[test]
    fn prop_duplicate_registration_fails(history in valid_history(), at in any::<prop::sample::Index>()) {
        let mut corrupted = history.clone();
        let position = 1 + at.index(history.len());
        corrupted.insert(position, user_registered("intruder"));

        let err = Behaviour::<User>::replay(&corrupted).unwrap_err();
        prop_assert_eq!(err.event_kind, "UserRegistered");
    }
}
