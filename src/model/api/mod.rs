//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Password hashes never leave the server.

pub mod auth;
pub mod election;
pub mod position;
pub mod results;
pub mod user;
pub mod vote;
