//! Database module
//!
//! SQLite storage for the reference nutrient table and computed recipes.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
