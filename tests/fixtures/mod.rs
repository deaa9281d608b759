// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-event-sourcing
//!
//! A small user-registration domain exercising state-dependent handler sets:
//!
//! ```text
//! Unregistered --RegisterUser/UserRegistered--> Registered --ChangePassword/PasswordChanged--> Registered
//! ```
//!
//! A registered user has no `RegisterUser` handler, so registering twice is a
//! `NoHandlerForCommand`, not a domain rejection.
#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cim_event_sourcing::{
    Aggregate, AggregateId, AggregateRepository, Behaviour, CausationId, CommandContext,
    CommandEnvelope, CommandId, DomainCommand, DomainEvent, DomainEventTag, InMemoryEventStore,
    Variant,
};

pub const USER_ID: &str = "user-42";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "pw";
pub const USER_TAG: &str = "user";

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangePassword {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    RegisterUser(RegisterUser),
    ChangePassword(ChangePassword),
}

impl DomainCommand for UserCommand {
    fn kind(&self) -> &'static str {
        match self {
            UserCommand::RegisterUser(_) => RegisterUser::KIND,
            UserCommand::ChangePassword(_) => ChangePassword::KIND,
        }
    }
}

impl Variant<UserCommand> for RegisterUser {
    const KIND: &'static str = "RegisterUser";

    fn narrow(parent: &UserCommand) -> Option<&Self> {
        match parent {
            UserCommand::RegisterUser(cmd) => Some(cmd),
            _ => None,
        }
    }
}

impl Variant<UserCommand> for ChangePassword {
    const KIND: &'static str = "ChangePassword";

    fn narrow(parent: &UserCommand) -> Option<&Self> {
        match parent {
            UserCommand::ChangePassword(cmd) => Some(cmd),
            _ => None,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UserEvent {
    UserRegistered(UserRegistered),
    PasswordChanged(PasswordChanged),
}

impl DomainEvent for UserEvent {
    fn kind(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => UserRegistered::KIND,
            UserEvent::PasswordChanged(_) => PasswordChanged::KIND,
        }
    }

    fn tag(&self) -> DomainEventTag {
        DomainEventTag::new(USER_TAG)
    }

    fn version(&self) -> u32 {
        match self {
            UserEvent::UserRegistered(_) => 1,
            UserEvent::PasswordChanged(_) => 2,
        }
    }
}

impl Variant<UserEvent> for UserRegistered {
    const KIND: &'static str = "UserRegistered";

    fn narrow(parent: &UserEvent) -> Option<&Self> {
        match parent {
            UserEvent::UserRegistered(event) => Some(event),
            _ => None,
        }
    }
}

impl Variant<UserEvent> for PasswordChanged {
    const KIND: &'static str = "PasswordChanged";

    fn narrow(parent: &UserEvent) -> Option<&Self> {
        match parent {
            UserEvent::PasswordChanged(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Aggregate
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    pub username: String,
    pub password: String,
    pub password_changes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    #[error("username must not be empty")]
    EmptyUsername,

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("new password must differ from the current one")]
    PasswordUnchanged,
}

pub struct User;

impl Aggregate for User {
    const NAME: &'static str = "user";

    type Command = UserCommand;
    type Event = UserEvent;
    type State = UserState;
    type Error = UserError;

    fn initial_behaviour() -> Behaviour<Self> {
        unregistered()
    }
}

fn unregistered() -> Behaviour<User> {
    Behaviour::builder(UserState::default())
        .on_command::<RegisterUser, _>(|cmd, ctx: &mut CommandContext<'_, User>| {
            ctx.require(!cmd.username.is_empty(), || UserError::EmptyUsername)
                .require(!cmd.password.is_empty(), || UserError::EmptyPassword);
            Ok(vec![UserEvent::UserRegistered(UserRegistered {
                username: cmd.username.clone(),
                password: cmd.password.clone(),
            })])
        })
        .on_event::<UserRegistered, _>(|event, _| {
            registered(UserState {
                username: event.username.clone(),
                password: event.password.clone(),
                password_changes: 0,
            })
        })
        .build()
}

fn registered(state: UserState) -> Behaviour<User> {
    Behaviour::builder(state)
        .on_command::<ChangePassword, _>(|cmd, ctx: &mut CommandContext<'_, User>| {
            if cmd.password.is_empty() {
                return Err(UserError::EmptyPassword);
            }
            ctx.require(cmd.password != ctx.state().password, || {
                UserError::PasswordUnchanged
            });
            Ok(vec![UserEvent::PasswordChanged(PasswordChanged {
                password: cmd.password.clone(),
            })])
        })
        .on_event::<PasswordChanged, _>(|event, behaviour| {
            let state = behaviour.state();
            behaviour.with_state(UserState {
                password: event.password.clone(),
                password_changes: state.password_changes + 1,
                ..state.clone()
            })
        })
        .build()
}

// ============================================================================
// Helpers
// ============================================================================

/// Route library logs to the test output, honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn user_id() -> AggregateId {
    AggregateId::new(USER_ID)
}

pub fn user_tag() -> DomainEventTag {
    DomainEventTag::new(USER_TAG)
}

pub fn repository() -> AggregateRepository<User, InMemoryEventStore> {
    AggregateRepository::new(Arc::new(InMemoryEventStore::new()))
}

pub fn register(command_id: &str, username: &str, password: &str) -> CommandEnvelope<UserCommand> {
    CommandEnvelope::new(
        CommandId::new(command_id),
        UserCommand::RegisterUser(RegisterUser {
            username: username.to_string(),
            password: password.to_string(),
        }),
    )
}

pub fn register_alice(causation: &str) -> CommandEnvelope<UserCommand> {
    register("cmd-register", USERNAME, PASSWORD).with_causation_id(CausationId::new(causation))
}

pub fn change_password(command_id: &str, password: &str) -> CommandEnvelope<UserCommand> {
    CommandEnvelope::new(
        CommandId::new(command_id),
        UserCommand::ChangePassword(ChangePassword {
            password: password.to_string(),
        }),
    )
}

pub fn user_registered(username: &str) -> UserEvent {
    UserEvent::UserRegistered(UserRegistered {
        username: username.to_string(),
        password: PASSWORD.to_string(),
    })
}

pub fn password_changed(password: &str) -> UserEvent {
    UserEvent::PasswordChanged(PasswordChanged {
        password: password.to_string(),
    })
}
