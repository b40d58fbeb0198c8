///
/// # SQLite Session
///
/// `SqliteSession` owns one rusqlite `Connection` and hands out row
/// iterators over it. Every successful `query` takes a lease on the session;
/// the iterator's session hook gives the lease back when the iterator closes.
///
/// The hook only holds a `Weak` reference to the lease counter, so an
/// iterator never keeps session bookkeeping alive on its own.
///

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use rowbridge::{DriverError, RowIterator, SessionHook};
use rusqlite::{Connection, Params};
use tracing::debug;

use crate::config::SqliteConfig;
use crate::cursor::SqliteCursor;
use crate::errors::SqliteFault;
use crate::statement::SqliteStatement;

pub type SqliteRows<'conn> = RowIterator<SqliteCursor<'conn>, SqliteStatement<'conn>>;

#[derive(Debug, Default)]
struct Leases {
    active: AtomicUsize,
}

pub struct SqliteSession {
    conn: Connection,
    leases: Arc<Leases>,
}

impl SqliteSession {
    pub fn open(config: &SqliteConfig) -> Result<Self, SqliteFault> {
        Ok(Self::from_connection(config.connect()?))
    }

    pub fn open_in_memory() -> Result<Self, SqliteFault> {
        Self::open(&SqliteConfig::in_memory())
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            leases: Arc::new(Leases::default()),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), SqliteFault> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Prepares and runs `sql`, returning an iterator positioned before the
    /// first row. Failures after the statement was prepared close it and
    /// return the lease before the error comes back.
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<SqliteRows<'_>, DriverError> {
        let statement = SqliteStatement::prepare(&self.conn, sql).map_err(DriverError::from_fault)?;
        let hook = self.lease();
        RowIterator::open(statement, hook, |stmt| stmt.open_cursor(params))
    }

    /// Iterators over this session that have not been closed yet.
    pub fn active_queries(&self) -> usize {
        self.leases.active.load(Ordering::SeqCst)
    }

    fn lease(&self) -> SessionHook {
        let active = self.leases.active.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(active, "session lease taken");
        let leases: Weak<Leases> = Arc::downgrade(&self.leases);
        SessionHook::new(move || {
            if let Some(leases) = leases.upgrade() {
                let active = leases.active.fetch_sub(1, Ordering::SeqCst) - 1;
                debug!(active, "session lease released");
            }
        })
    }
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("active_queries", &self.active_queries())
            .finish()
    }
}
