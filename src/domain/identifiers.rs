// Copyright (c) 2025 - Cowboy AI, Inc.
//! Identifier Value Objects
//!
//! Opaque, comparable keys. They carry no behaviour beyond construction,
//! equality and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier value
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh, time-ordered identifier (UUID v7)
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning the inner string
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_identifier!(
    /// Identifies one aggregate instance within its aggregate type
    AggregateId
);

string_identifier!(
    /// Unique per logical command instance
    CommandId
);

string_identifier!(
    /// Identifies the upstream stimulus that produced a command
    ///
    /// Stable across redeliveries of the same stimulus, which is what
    /// command deduplication keys on.
    CausationId
);

string_identifier!(
    /// Groups a causal chain of commands and events across aggregates
    CorrelationId
);

string_identifier!(
    /// Unique identifier of a persisted event
    EventId
);

impl From<&CommandId> for CausationId {
    /// A command with no upstream stimulus is its own cause.
    fn from(command_id: &CommandId) -> Self {
        CausationId::new(command_id.as_str())
    }
}
