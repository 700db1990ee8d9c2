//! Agent controller
//!
//! Chooses which persona a session starts under, derives the caller's
//! display name from the bearer token, and builds the out-of-band handoff
//! event. Handoffs are never performed in-process: the browser receives
//! `agent.handoff` and reconnects as a fresh session under the other role.

pub mod controller;
pub mod token;

pub use controller::{handoff_event, select_role, session_context};
pub use token::introspect_token;
