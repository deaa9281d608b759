// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Sourcing Domain Model
//!
//! Identifier value objects and the traits a domain implements to describe an
//! aggregate type: its command kinds, event kinds, state and rejection cause.
//!
//! - [`AggregateId`], [`CommandId`], [`CausationId`], [`CorrelationId`], [`EventId`]
//! - [`Aggregate`] - aggregate type with its canonical initial behaviour
//! - [`DomainCommand`] / [`DomainEvent`] - closed enums reporting their kind
//! - [`Variant`] - narrows a closed enum to one concrete kind
//! - [`DomainEventTag`] - category label for stream subscription

pub mod aggregate;
pub mod identifiers;

pub use aggregate::{Aggregate, DomainCommand, DomainEvent, DomainEventTag, Variant};
pub use identifiers::{AggregateId, CausationId, CommandId, CorrelationId, EventId};
