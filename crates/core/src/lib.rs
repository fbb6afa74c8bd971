//! Shared domain types for the onboard backend.
//!
//! - [`types`] -- primary key and timestamp aliases.
//! - [`error`] -- [`CoreError`](error::CoreError), the domain error taxonomy.
//! - [`roles`] -- well-known role names.
//! - [`event_types`] -- well-known event names published on the event bus.

pub mod error;
pub mod event_types;
pub mod roles;
pub mod types;
