///
/// SQLite adapter fault types.
///
/// These never reach rowbridge callers as-is: the row iterator turns them
/// into `DriverError` using their display text.
///

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteFault {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Column index {column} out of range 1..={count}")]
    ColumnIndex { column: usize, count: usize },

    #[error("Cursor is not positioned on a row")]
    NoCurrentRow,

    #[error("Cursor is closed")]
    Closed,

    #[error("Statement already has an open cursor")]
    CursorAlreadyOpen,

    #[error("Cannot convert {from} to {to}: {reason}")]
    Conversion {
        from: &'static str,
        to: &'static str,
        reason: String,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
