///
/// Prepared statement handle.
///
/// rusqlite's `Rows` borrows the `Statement` it steps, but rowbridge wants
/// the statement and the cursor as two separately owned handles. The
/// statement is therefore boxed and leaked on prepare, the cursor borrows
/// the leaked allocation, and `close` reclaims and finalizes it. The row
/// iterator always closes the cursor before the statement, which keeps the
/// borrow valid.
///

use std::ptr::NonNull;

use rowbridge::Statement as StatementHandle;
use rusqlite::{Connection, Params, Statement};
use tracing::debug;

use crate::cursor::SqliteCursor;
use crate::errors::SqliteFault;
use crate::types::describe;

pub struct SqliteStatement<'conn> {
    raw: Option<NonNull<Statement<'conn>>>,
    cursor_opened: bool,
}

impl<'conn> SqliteStatement<'conn> {
    pub(crate) fn prepare(conn: &'conn Connection, sql: &str) -> Result<Self, SqliteFault> {
        let stmt = conn.prepare(sql)?;
        let raw = NonNull::from(Box::leak(Box::new(stmt)));
        Ok(Self {
            raw: Some(raw),
            cursor_opened: false,
        })
    }

    /// Binds `params`, executes, and returns the cursor over the result.
    /// Only one cursor may be opened per statement.
    pub(crate) fn open_cursor<P: Params>(&mut self, params: P) -> Result<SqliteCursor<'conn>, SqliteFault> {
        let raw = self.raw.ok_or(SqliteFault::Closed)?;
        if self.cursor_opened {
            return Err(SqliteFault::CursorAlreadyOpen);
        }
        self.cursor_opened = true;

        // SAFETY: `raw` came from `Box::leak` and is only freed in `close`
        // or `drop`. No other reference to it exists, and the cursor holding
        // this borrow is closed before the statement.
        let stmt: &'conn mut Statement<'conn> = unsafe { &mut *raw.as_ptr() };
        let columns = describe(stmt);
        let rows = stmt.query(params)?;
        debug!(columns = columns.len(), "sqlite cursor opened");
        Ok(SqliteCursor::new(rows, columns))
    }

    pub fn is_closed(&self) -> bool {
        self.raw.is_none()
    }
}

impl StatementHandle for SqliteStatement<'_> {
    type Fault = SqliteFault;

    fn close(&mut self) -> Result<(), SqliteFault> {
        if let Some(raw) = self.raw.take() {
            // SAFETY: see `open_cursor`; the cursor has already been closed.
            let stmt = unsafe { Box::from_raw(raw.as_ptr()) };
            stmt.finalize()?;
            debug!("sqlite statement finalized");
        }
        Ok(())
    }
}

impl Drop for SqliteStatement<'_> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            // SAFETY: see `open_cursor`.
            drop(unsafe { Box::from_raw(raw.as_ptr()) });
        }
    }
}
