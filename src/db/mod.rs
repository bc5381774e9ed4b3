//! Database layer (SQLite).

mod migrations;
pub mod sqlite;

pub use sqlite::{SqliteDb, StoreOutcome};
