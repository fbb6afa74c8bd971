//! Event name constants.
//!
//! Publishers and handler registrations must agree on these strings; the
//! bus routes purely by exact name match.

/// Published by the signup handler after the user row has been committed.
/// Payload: `{ "email": string }`.
pub const EVENT_USER_SIGNUP: &str = "user/signup";
