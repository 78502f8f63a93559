//! # storage-adapters
//!
//! Implementations of the `domains::ports` traits.
//!
//! - [`memory`]: process-local stores backed by `dashmap`, always compiled.
//!   Used by tests and single-node development setups.
//! - `postgres` (feature `db-postgres`): `sqlx` adapters over PostgreSQL.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;
