// Copyright (c) 2025 - Cowboy AI, Inc.
//! Behaviour - State-Dependent Command and Event Handling
//!
//! A [`Behaviour`] is an immutable snapshot of an aggregate: its materialised
//! state plus the command handlers and event handlers active in that state.
//!
//! ```text
//! (Behaviour, Command) → Result<[Event], CommandError>
//! (Behaviour, Event)   → Result<Behaviour, NoHandlerForEvent>
//! ```
//!
//! Lifecycle transitions are expressed by swapping handler sets, not just
//! data: once a user is registered, the behaviour returned by the
//! `UserRegistered` handler simply has no `RegisterUser` handler, so a second
//! registration fails with [`NoHandlerForCommand`].
//!
//! # Purity
//!
//! Handlers are synchronous and must not perform I/O. Folding the same
//! history from [`Aggregate::initial_behaviour`] always yields the same
//! behaviour. Handler registries are shared behind `Arc`, so
//! [`Behaviour::with_state`] is cheap and never mutates the original.
//!
//! # Example
//!
//! ```rust,ignore
//! fn unregistered() -> Behaviour<User> {
//!     Behaviour::builder(UserState::default())
//!         .on_command::<RegisterUser, _>(|cmd, ctx| {
//!             ctx.require(!cmd.username.is_empty(), || UserError::EmptyUsername);
//!             Ok(vec![UserEvent::UserRegistered(UserRegistered { .. })])
//!         })
//!         .on_event::<UserRegistered, _>(|event, _| registered(UserState::from(event)))
//!         .build()
//! }
//! ```

mod context;

pub use context::{CommandContext, CommandMetadata};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{Aggregate, DomainCommand, DomainEvent, Variant};
use crate::errors::{CommandError, NoHandlerForCommand, NoHandlerForEvent};

/// Type-erased command handler. `None` means the command did not narrow to
/// the registered variant.
type CommandHandler<A> = Arc<
    dyn Fn(
            &<A as Aggregate>::Command,
            &mut CommandContext<'_, A>,
        ) -> Option<Result<Vec<<A as Aggregate>::Event>, <A as Aggregate>::Error>>
        + Send
        + Sync,
>;

/// Type-erased event handler. `None` means the event did not narrow to the
/// registered variant.
type EventHandler<A> =
    Arc<dyn Fn(&<A as Aggregate>::Event, &Behaviour<A>) -> Option<Behaviour<A>> + Send + Sync>;

/// Immutable state machine snapshot for one aggregate instance
pub struct Behaviour<A: Aggregate> {
    state: A::State,
    command_handlers: Arc<HashMap<&'static str, CommandHandler<A>>>,
    event_handlers: Arc<HashMap<&'static str, EventHandler<A>>>,
}

impl<A: Aggregate> Clone for Behaviour<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            command_handlers: Arc::clone(&self.command_handlers),
            event_handlers: Arc::clone(&self.event_handlers),
        }
    }
}

impl<A: Aggregate> fmt::Debug for Behaviour<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviour")
            .field("aggregate_type", &A::NAME)
            .field("state", &self.state)
            .field("commands", &self.command_kinds())
            .field("events", &self.event_kinds())
            .finish()
    }
}

impl<A: Aggregate> Behaviour<A> {
    /// Start building a behaviour with no handlers
    pub fn builder(state: A::State) -> BehaviourBuilder<A> {
        BehaviourBuilder::new(state)
    }

    /// Fold a history from the aggregate's canonical initial behaviour
    pub fn replay<'e, I>(events: I) -> Result<Self, NoHandlerForEvent>
    where
        I: IntoIterator<Item = &'e A::Event>,
    {
        fold_events(A::initial_behaviour(), events)
    }

    /// Current materialised state
    pub fn state(&self) -> &A::State {
        &self.state
    }

    /// New behaviour with the same handlers and a different state
    pub fn with_state(&self, state: A::State) -> Self {
        Self {
            state,
            command_handlers: Arc::clone(&self.command_handlers),
            event_handlers: Arc::clone(&self.event_handlers),
        }
    }

    /// Builder seeded with this behaviour's state and handlers
    pub fn to_builder(&self) -> BehaviourBuilder<A> {
        BehaviourBuilder {
            state: self.state.clone(),
            command_handlers: (*self.command_handlers).clone(),
            event_handlers: (*self.event_handlers).clone(),
        }
    }

    /// Whether a handler is registered for this command kind
    pub fn handles_command(&self, kind: &str) -> bool {
        self.command_handlers.contains_key(kind)
    }

    /// Whether a handler is registered for this event kind
    pub fn handles_event(&self, kind: &str) -> bool {
        self.event_handlers.contains_key(kind)
    }

    /// Registered command kinds, sorted
    pub fn command_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.command_handlers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Registered event kinds, sorted
    pub fn event_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.event_handlers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// Decide which events a command produces in the current state
    ///
    /// # Errors
    /// - [`CommandError::NoHandler`] if this state has no handler for the
    ///   command's kind
    /// - [`CommandError::Rejected`] if the handler returns an error or a
    ///   staged condition fails
    pub fn handle_command(
        &self,
        command: &A::Command,
        metadata: &CommandMetadata,
    ) -> Result<Vec<A::Event>, CommandError<A::Error>> {
        let kind = command.kind();
        let no_handler = || NoHandlerForCommand {
            aggregate_type: A::NAME,
            command_kind: kind,
        };

        let handler = self.command_handlers.get(kind).ok_or_else(no_handler)?;
        let mut context = CommandContext::new(&self.state, metadata);
        let events = handler(command, &mut context)
            .ok_or_else(no_handler)?
            .map_err(CommandError::Rejected)?;

        match context.into_first_failure() {
            Some(failure) => Err(CommandError::Rejected(failure)),
            None => Ok(events),
        }
    }

    /// Fold one event, returning the next behaviour
    ///
    /// # Errors
    /// [`NoHandlerForEvent`] if this state has no handler for the event kind.
    /// Replay must stop: the history and the code disagree.
    pub fn handle_event(&self, event: &A::Event) -> Result<Self, NoHandlerForEvent> {
        let kind = event.kind();
        let no_handler = || NoHandlerForEvent {
            aggregate_type: A::NAME,
            event_kind: kind,
        };

        let handler = self.event_handlers.get(kind).ok_or_else(no_handler)?;
        handler(event, self).ok_or_else(no_handler)
    }
}

/// Fold events in order, starting from `initial`
///
/// Stops at the first event without a handler.
pub fn fold_events<'e, A, I>(initial: Behaviour<A>, events: I) -> Result<Behaviour<A>, NoHandlerForEvent>
where
    A: Aggregate,
    I: IntoIterator<Item = &'e A::Event>,
{
    events
        .into_iter()
        .try_fold(initial, |behaviour, event| behaviour.handle_event(event))
}

/// Builder for [`Behaviour`]
pub struct BehaviourBuilder<A: Aggregate> {
    state: A::State,
    command_handlers: HashMap<&'static str, CommandHandler<A>>,
    event_handlers: HashMap<&'static str, EventHandler<A>>,
}

impl<A: Aggregate> BehaviourBuilder<A> {
    /// Create a builder with no handlers
    pub fn new(state: A::State) -> Self {
        Self {
            state,
            command_handlers: HashMap::new(),
            event_handlers: HashMap::new(),
        }
    }

    /// Replace the state
    pub fn state(mut self, state: A::State) -> Self {
        self.state = state;
        self
    }

    /// Register the handler for command kind `V`, replacing any existing one
    pub fn on_command<V, F>(mut self, handler: F) -> Self
    where
        V: Variant<A::Command>,
        F: Fn(&V, &mut CommandContext<'_, A>) -> Result<Vec<A::Event>, A::Error>
            + Send
            + Sync
            + 'static,
    {
        let erased: CommandHandler<A> = Arc::new(
            move |command: &A::Command, context: &mut CommandContext<'_, A>| {
                V::narrow(command).map(|cmd| handler(cmd, context))
            },
        );
        self.command_handlers.insert(V::KIND, erased);
        self
    }

    /// Register the handler for event kind `V`, replacing any existing one
    pub fn on_event<V, F>(mut self, handler: F) -> Self
    where
        V: Variant<A::Event>,
        F: Fn(&V, &Behaviour<A>) -> Behaviour<A> + Send + Sync + 'static,
    {
        let erased: EventHandler<A> =
            Arc::new(move |event: &A::Event, behaviour: &Behaviour<A>| {
                V::narrow(event).map(|e| handler(e, behaviour))
            });
        self.event_handlers.insert(V::KIND, erased);
        self
    }

    /// Drop the handler for a command kind
    pub fn without_command(mut self, kind: &str) -> Self {
        self.command_handlers.remove(kind);
        self
    }

    /// Drop the handler for an event kind
    pub fn without_event(mut self, kind: &str) -> Self {
        self.event_handlers.remove(kind);
        self
    }

    /// Freeze the behaviour
    pub fn build(self) -> Behaviour<A> {
        Behaviour {
            state: self.state,
            command_handlers: Arc::new(self.command_handlers),
            event_handlers: Arc::new(self.event_handlers),
        }
    }
}
