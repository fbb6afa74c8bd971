//! Outbound delivery channels used by event handlers.

pub mod email;
