//! A client registry backed by PostgreSQL: clients with unique emails, each
//! owning any number of phone numbers.
//!
//! [`db::schema`] provisions the tables, [`db::registry`] holds the
//! operations, and [`db::Database`] wraps both behind a connection pool.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{RegistryError, Result};
