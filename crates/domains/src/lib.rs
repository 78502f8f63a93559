//! domains/src/lib.rs
//!
//! Entities, pure domain rules and port definitions for the forum core.

pub mod access;
pub mod errors;
pub mod invite;
pub mod models;
pub mod outcome;
pub mod ports;
pub mod reputation;
pub mod vote;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use outcome::*;
