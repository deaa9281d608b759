// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregate, Command and Event Kinds
//!
//! Commands and events are closed enums per aggregate. Each enum reports the
//! concrete kind of a value through `kind()`, and each variant payload can be
//! recovered from its enum through [`Variant`]. Behaviours key their handler
//! registries on that kind, so dispatch never relies on a shared numeric code.
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(Debug, Clone)]
//! pub struct RegisterUser { pub username: String, pub password: String }
//!
//! #[derive(Debug, Clone)]
//! pub enum UserCommand { RegisterUser(RegisterUser) }
//!
//! impl DomainCommand for UserCommand {
//!     fn kind(&self) -> &'static str {
//!         match self { UserCommand::RegisterUser(_) => RegisterUser::KIND }
//!     }
//! }
//!
//! impl Variant<UserCommand> for RegisterUser {
//!     const KIND: &'static str = "RegisterUser";
//!     fn narrow(parent: &UserCommand) -> Option<&Self> {
//!         match parent { UserCommand::RegisterUser(cmd) => Some(cmd) }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::behaviour::Behaviour;

/// Category label attached to an event kind
///
/// Subscribers on the global stream filter by tag, independently of the
/// aggregate type that produced the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainEventTag(String);

impl DomainEventTag {
    /// Create a tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Get the tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainEventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainEventTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Closed set of commands accepted by one aggregate type
pub trait DomainCommand: fmt::Debug + Send + Sync + 'static {
    /// Concrete kind of this command (the variant name)
    fn kind(&self) -> &'static str;
}

/// Closed set of events produced by one aggregate type
///
/// Events are immutable facts; `Serialize` lets stores expose the payload on
/// the global stream.
pub trait DomainEvent: fmt::Debug + Clone + Serialize + Send + Sync + 'static {
    /// Concrete kind of this event (the variant name)
    fn kind(&self) -> &'static str;

    /// Tag used for category-based stream subscription
    fn tag(&self) -> DomainEventTag;

    /// Schema version of the serialised payload
    fn version(&self) -> u32 {
        1
    }
}

/// One concrete variant payload of a closed command or event enum
pub trait Variant<Parent>: Sized + 'static {
    /// Kind reported by `Parent::kind()` for values of this variant
    const KIND: &'static str;

    /// Borrow the payload if `parent` is this variant
    fn narrow(parent: &Parent) -> Option<&Self>;
}

/// An aggregate type: the partition key of the store plus its command, event
/// and state kinds
///
/// The implementing type is a marker; state lives in [`Aggregate::State`] and
/// the active handler set lives in the [`Behaviour`].
pub trait Aggregate: Sized + Send + Sync + 'static {
    /// Aggregate type name, used as the store partition key
    const NAME: &'static str;

    /// Commands this aggregate handles
    type Command: DomainCommand;

    /// Events this aggregate produces and folds
    type Event: DomainEvent;

    /// Materialised state
    type State: Clone + fmt::Debug + Send + Sync + 'static;

    /// Domain rejection cause
    type Error: std::error::Error + Send + Sync + 'static;

    /// The canonical behaviour every fold starts from
    fn initial_behaviour() -> Behaviour<Self>;
}
