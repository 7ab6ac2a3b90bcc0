pub mod mapping;
pub mod sqlite;

pub use sqlite::{DatabaseManager, SqliteJobRepository};
