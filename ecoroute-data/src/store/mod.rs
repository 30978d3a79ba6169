//! Persistent result sinks.

mod sqlite;

pub use sqlite::{SqliteResultSink, SqliteSinkError};
