///
/// rowbridge SQLite3 driver adapter
///
/// Runs queries through rusqlite (bundled SQLite) and exposes the results as
/// rowbridge `RowIterator`s.
///
/// Architecture:
/// - `SqliteSession` owns the connection and leases it to each query.
/// - `SqliteStatement` owns the prepared statement and finalizes it on close.
/// - `SqliteCursor` steps the statement one row at a time and relays every
///   typed getter through SQLite's conversion rules.
/// - `SqliteConfig` is the TOML-backed connection configuration.
/// - Faults are `SqliteFault`; callers only ever see them as `DriverError`.
///

pub mod config;
mod convert;
pub mod cursor;
pub mod errors;
pub mod session;
pub mod statement;
pub mod types;

pub use config::SqliteConfig;
pub use cursor::SqliteCursor;
pub use errors::SqliteFault;
pub use session::{SqliteRows, SqliteSession};
pub use statement::SqliteStatement;
