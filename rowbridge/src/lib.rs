///
/// # rowbridge: uniform rows over native SQL cursors
///
/// Sits between a driver's forward-only result cursor and the code that
/// consumes query results. Whatever driver produced the result, callers see
/// the same `RowIterator` with 1-based typed getters, the same `MetadataView`,
/// and a single `DriverError` type on every read path.
///
/// ## Usage
///
/// ```rust,ignore
/// use rowbridge::{RowIterator, SessionHook};
///
/// let mut rows = RowIterator::new(cursor, statement, SessionHook::new(move || lease.release()));
/// let metadata = rows.metadata()?;
/// while rows.next()? {
///     let id = rows.get_long(1)?;
///     let name = rows.get_string(2)?;
/// }
/// rows.close();
/// ```
///
/// Driver adapters implement [`Cursor`] and [`Statement`]; see the
/// `rowbridge-sqlite3` crate for one backed by SQLite.
///

pub mod cursor;
pub mod error;
pub mod iterator;
pub mod materialize;
pub mod metadata;
pub mod session;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cursor::{Cursor, Statement};
pub use error::{CloseFault, CloseStep, DriverError, Result};
pub use iterator::RowIterator;
pub use materialize::{RowMap, materialize};
pub use metadata::{ColumnDescriptor, MetadataView, Nullability, SqlType};
pub use session::SessionHook;
pub use value::{ByteStream, Value};
