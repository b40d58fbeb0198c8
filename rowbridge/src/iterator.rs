///
/// # Row Iterator
///
/// `RowIterator` owns one driver cursor, the statement that produced it and
/// the session's release hook. It relays reads to the cursor and maps every
/// driver fault to `DriverError`, so callers handle a single error type.
///
/// ## Teardown
///
/// `close()` runs three steps in a fixed order: close the cursor, close the
/// statement, release the session. A failing step is logged and recorded as
/// a `CloseFault`; the remaining steps still run. `close()` itself never
/// fails and is idempotent. `Drop` calls it, so an abandoned iterator still
/// releases everything it holds.
///
/// ## Scoped Construction
///
/// `RowIterator::open` builds the cursor from an already executed statement.
/// If that fails, the statement is closed and the session released before
/// the error is returned.
///
/// ## Threading
///
/// One iterator belongs to one caller. The cursor is position-sensitive, so
/// sharing an iterator across threads needs external synchronization.
///

use std::cell::OnceCell;
use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, error};

use crate::cursor::{Cursor, Statement};
use crate::error::{CloseFault, CloseStep, DriverError, Result};
use crate::materialize::{RowMap, materialize};
use crate::metadata::MetadataView;
use crate::session::SessionHook;
use crate::value::{ByteStream, Value};

macro_rules! relay_getter {
    ($(#[$doc:meta])* $name:ident -> $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self, column: usize) -> Result<$ty> {
            self.cursor_mut(stringify!($name))?
                .$name(column)
                .map_err(DriverError::from_fault)
        }
    };
}

pub struct RowIterator<C: Cursor, S: Statement> {
    // Field order matters: the cursor may borrow from the statement.
    cursor: Option<C>,
    statement: Option<S>,
    session: SessionHook,
    metadata: OnceCell<MetadataView>,
    close_faults: Vec<CloseFault>,
}

impl<C: Cursor, S: Statement> RowIterator<C, S> {
    pub fn new(cursor: C, statement: S, session: SessionHook) -> Self {
        debug!("row iterator opened");
        Self {
            cursor: Some(cursor),
            statement: Some(statement),
            session,
            metadata: OnceCell::new(),
            close_faults: Vec::new(),
        }
    }

    pub fn open<F, E>(mut statement: S, mut session: SessionHook, open_cursor: F) -> Result<Self>
    where
        F: FnOnce(&mut S) -> std::result::Result<C, E>,
        E: fmt::Display,
    {
        match open_cursor(&mut statement) {
            Ok(cursor) => Ok(Self::new(cursor, statement, session)),
            Err(e) => {
                let err = DriverError::from_fault(&e);
                debug!(error = %err, "cursor open failed, releasing statement and session");
                if let Err(fault) = statement.close() {
                    report(CloseFault::new(CloseStep::Statement, fault));
                }
                if let Err(fault) = session.release() {
                    report(fault);
                }
                Err(err)
            }
        }
    }

    fn cursor(&self, operation: &'static str) -> Result<&C> {
        self.cursor.as_ref().ok_or(DriverError::Closed { operation })
    }

    fn cursor_mut(&mut self, operation: &'static str) -> Result<&mut C> {
        self.cursor.as_mut().ok_or(DriverError::Closed { operation })
    }

    /// Column metadata for this result. Taken from the cursor on first call
    /// and reused afterwards.
    pub fn metadata(&self) -> Result<MetadataView> {
        let cursor = self.cursor("read metadata")?;
        if let Some(view) = self.metadata.get() {
            return Ok(view.clone());
        }
        let columns = cursor.metadata().map_err(DriverError::from_fault)?;
        let view = MetadataView::new(columns);
        Ok(self.metadata.get_or_init(|| view).clone())
    }

    /// Advance to the next row. Returns `false` once the rows are exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool> {
        self.cursor_mut("advance")?
            .next()
            .map_err(DriverError::from_fault)
    }

    /// Whether the last column read was SQL NULL. Before any getter has run on
    /// the current row the answer comes from the driver and is not defined here.
    pub fn was_null(&self) -> Result<bool> {
        self.cursor("check for null")?
            .was_null()
            .map_err(DriverError::from_fault)
    }

    relay_getter!(get_string -> Option<String>);
    relay_getter!(get_boolean -> bool);
    relay_getter!(get_byte -> i8);
    relay_getter!(get_short -> i16);
    relay_getter!(get_int -> i32);
    relay_getter!(get_long -> i64);
    relay_getter!(get_float -> f32);
    relay_getter!(get_double -> f64);
    relay_getter!(get_bytes -> Option<Vec<u8>>);
    relay_getter!(get_date -> Option<NaiveDate>);
    relay_getter!(get_time -> Option<NaiveTime>);
    relay_getter!(get_timestamp -> Option<NaiveDateTime>);
    relay_getter!(
        /// Character data as a byte stream.
        get_ascii_stream -> Option<ByteStream>
    );
    relay_getter!(get_binary_stream -> Option<ByteStream>);
    relay_getter!(
        /// The column in the driver's native representation.
        get_object -> Value
    );
    relay_getter!(get_big_decimal -> Option<BigDecimal>);

    /// Drain the remaining rows into name/value maps. See [`materialize`].
    pub fn materialize(&mut self) -> Result<Vec<RowMap>> {
        materialize(self)
    }

    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                self.record(CloseFault::new(CloseStep::Cursor, e));
            }
        }
        if let Some(mut statement) = self.statement.take() {
            if let Err(e) = statement.close() {
                self.record(CloseFault::new(CloseStep::Statement, e));
            }
        }
        if let Err(fault) = self.session.release() {
            self.record(fault);
        }
        debug!(faults = self.close_faults.len(), "row iterator closed");
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_none() && self.statement.is_none() && self.session.is_released()
    }

    /// Faults swallowed by `close()`, in the order they happened.
    pub fn close_faults(&self) -> &[CloseFault] {
        &self.close_faults
    }

    fn record(&mut self, fault: CloseFault) {
        report(fault.clone());
        self.close_faults.push(fault);
    }
}

impl<C: Cursor, S: Statement> Drop for RowIterator<C, S> {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.close();
        }
    }
}

impl<C: Cursor, S: Statement> fmt::Debug for RowIterator<C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIterator")
            .field("closed", &self.is_closed())
            .field("close_faults", &self.close_faults)
            .finish()
    }
}

fn report(fault: CloseFault) {
    error!(step = %fault.step, "{}", fault);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ColumnDescriptor, Nullability, SqlType};
    use crate::testing::{EventLog, ScriptedCursor, ScriptedFault, ScriptedStatement};
    use std::io::Read;

    type Scripted = RowIterator<ScriptedCursor, ScriptedStatement>;

    fn people() -> Vec<Vec<Value>> {
        vec![
            vec![Value::from(1i64), Value::from("a")],
            vec![Value::from(2i64), Value::from("b")],
            vec![Value::from(3i64), Value::Null],
        ]
    }

    fn iterator_with(cursor: ScriptedCursor, events: &EventLog) -> Scripted {
        let cursor = cursor.with_events(events.clone());
        let statement = ScriptedStatement::new().with_events(events.clone());
        RowIterator::new(cursor, statement, events.hook())
    }

    fn people_iterator(events: &EventLog) -> Scripted {
        iterator_with(ScriptedCursor::with_names(&["id", "name"], people()), events)
    }

    #[test]
    fn test_next_true_row_count_times_then_false_forever() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);

        let mut seen = 0;
        while rows.next().unwrap() {
            seen += 1;
        }
        assert_eq!(seen, 3, "next() should report each row once");
        for _ in 0..3 {
            assert!(!rows.next().unwrap(), "Exhausted iterator should keep returning false");
        }
    }

    #[test]
    fn test_empty_result() {
        let events = EventLog::new();
        let mut rows = iterator_with(ScriptedCursor::with_names(&["id"], Vec::new()), &events);
        assert!(!rows.next().unwrap());
        assert_eq!(rows.metadata().unwrap().column_count(), 1);
    }

    #[test]
    fn test_getters_relay_values() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        assert!(rows.next().unwrap());

        assert_eq!(rows.get_long(1).unwrap(), 1);
        assert_eq!(rows.get_int(1).unwrap(), 1);
        assert_eq!(rows.get_short(1).unwrap(), 1);
        assert_eq!(rows.get_byte(1).unwrap(), 1);
        assert_eq!(rows.get_double(1).unwrap(), 1.0);
        assert_eq!(rows.get_float(1).unwrap(), 1.0);
        assert!(rows.get_boolean(1).unwrap());
        assert_eq!(rows.get_string(1).unwrap().as_deref(), Some("1"));
        assert_eq!(rows.get_big_decimal(1).unwrap(), Some(BigDecimal::from(1)));
        assert_eq!(rows.get_string(2).unwrap().as_deref(), Some("a"));
        assert_eq!(rows.get_bytes(2).unwrap(), Some(b"a".to_vec()));
        assert_eq!(rows.get_object(2).unwrap(), Value::from("a"));

        let mut text = String::new();
        rows.get_ascii_stream(2)
            .unwrap()
            .expect("Non-null column should yield a stream")
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "a");

        let mut bytes = Vec::new();
        rows.get_binary_stream(2)
            .unwrap()
            .expect("Non-null column should yield a stream")
            .read_to_end(&mut bytes)
            .unwrap();
        assert_eq!(bytes, b"a");
    }

    #[test]
    fn test_temporal_getters() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let cursor = ScriptedCursor::with_names(
            &["at", "day"],
            vec![vec![Value::Timestamp(ts), Value::from("2024-03-10")]],
        );
        let events = EventLog::new();
        let mut rows = iterator_with(cursor, &events);
        assert!(rows.next().unwrap());

        assert_eq!(rows.get_timestamp(1).unwrap(), Some(ts));
        assert_eq!(rows.get_date(1).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(rows.get_time(1).unwrap(), NaiveTime::from_hms_opt(10, 30, 0));
        assert_eq!(rows.get_date(2).unwrap(), NaiveDate::from_ymd_opt(2024, 3, 10));
    }

    #[test]
    fn test_column_index_bounds() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        assert!(rows.next().unwrap());

        let count = rows.metadata().unwrap().column_count();
        for column in 1..=count {
            assert!(rows.get_object(column).is_ok(), "Column {} should be readable", column);
        }
        for column in [0, count + 1] {
            match rows.get_object(column) {
                Err(DriverError::Fault { message }) => {
                    assert!(message.contains("out of range"), "Unexpected message: {}", message);
                }
                other => panic!("Expected a driver fault for column {}, got {:?}", column, other),
            }
        }
    }

    #[test]
    fn test_getter_before_first_row_fails() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        let err = rows.get_string(1).expect_err("No current row yet");
        assert!(err.to_string().contains("not positioned"));
    }

    #[test]
    fn test_conversion_failure_is_driver_error() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        assert!(rows.next().unwrap());
        let err = rows.get_int(2).expect_err("'a' is not a number");
        assert!(matches!(err, DriverError::Fault { .. }));
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn test_was_null_tracks_last_getter() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        for _ in 0..3 {
            assert!(rows.next().unwrap());
        }

        assert_eq!(rows.get_string(2).unwrap(), None);
        assert!(rows.was_null().unwrap(), "NULL column should set was_null");

        assert_eq!(rows.get_long(1).unwrap(), 3);
        assert!(!rows.was_null().unwrap(), "Non-NULL column should clear was_null");

        assert_eq!(rows.get_int(2).unwrap(), 0, "Primitive getters read NULL as zero");
        assert!(rows.was_null().unwrap());
    }

    #[test]
    fn test_fault_on_third_next_leaves_earlier_rows_intact() {
        let events = EventLog::new();
        let cursor = ScriptedCursor::with_names(&["id", "name"], people())
            .fail_next_at(3, "connection lost");
        let mut rows = iterator_with(cursor, &events);

        let mut read = Vec::new();
        for _ in 0..2 {
            assert!(rows.next().unwrap());
            read.push((rows.get_long(1).unwrap(), rows.get_string(2).unwrap()));
        }

        let err = rows.next().expect_err("Third next() should fail");
        assert_eq!(err, DriverError::Fault { message: "connection lost".to_string() });
        assert_eq!(
            read,
            vec![(1, Some("a".to_string())), (2, Some("b".to_string()))]
        );

        rows.close();
        assert_eq!(events.count("session.release"), 1);
    }

    #[test]
    fn test_metadata_is_position_independent() {
        let columns = vec![
            ColumnDescriptor::new("id", SqlType::BigInt).with_nullability(Nullability::NoNulls),
            ColumnDescriptor::new("name", SqlType::VarChar).with_origin("main", "people"),
        ];
        let events = EventLog::new();
        let mut rows = iterator_with(ScriptedCursor::new(columns, people()), &events);

        let before = rows.metadata().unwrap();
        assert!(rows.next().unwrap());
        assert!(rows.next().unwrap());
        let during = rows.metadata().unwrap();

        assert_eq!(before, during);
        assert_eq!(during.column_count(), 2);
        assert_eq!(during.table_name(2).unwrap(), "people");
    }

    #[test]
    fn test_metadata_fault_is_driver_error() {
        let events = EventLog::new();
        let cursor = ScriptedCursor::with_names(&["id"], Vec::new()).fail_metadata("descriptor unavailable");
        let rows = iterator_with(cursor, &events);
        let err = rows.metadata().expect_err("Metadata should fail");
        assert_eq!(err.to_string(), "descriptor unavailable");
    }

    #[test]
    fn test_close_order_and_single_release() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        assert!(rows.next().unwrap());

        rows.close();
        rows.close();

        assert!(rows.is_closed());
        assert_eq!(
            events.events(),
            vec!["cursor.close", "statement.close", "session.release"]
        );
        assert!(rows.close_faults().is_empty());
    }

    #[test]
    fn test_close_continues_past_failures() {
        let events = EventLog::new();
        let cursor = ScriptedCursor::with_names(&["id"], Vec::new())
            .with_events(events.clone())
            .fail_close("cursor already gone");
        let statement = ScriptedStatement::new()
            .with_events(events.clone())
            .fail_close("statement busy");
        let mut rows = RowIterator::new(cursor, statement, events.hook());

        rows.close();

        assert_eq!(
            events.events(),
            vec!["cursor.close", "statement.close", "session.release"],
            "Every teardown step should run even when earlier ones fail"
        );
        let steps: Vec<CloseStep> = rows.close_faults().iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![CloseStep::Cursor, CloseStep::Statement]);
        assert_eq!(rows.close_faults()[0].message, "cursor already gone");
    }

    #[test]
    fn test_panicking_session_hook_is_swallowed() {
        let events = EventLog::new();
        let cursor = ScriptedCursor::with_names(&["id"], Vec::new()).with_events(events.clone());
        let statement = ScriptedStatement::new().with_events(events.clone());
        let mut rows = RowIterator::new(cursor, statement, SessionHook::new(|| panic!("lease lost")));

        rows.close();

        assert_eq!(rows.close_faults().len(), 1);
        assert_eq!(rows.close_faults()[0].step, CloseStep::Session);
        assert!(rows.is_closed());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let events = EventLog::new();
        let mut rows = people_iterator(&events);
        assert_eq!(rows.metadata().unwrap().column_count(), 2);
        rows.close();

        assert!(matches!(rows.next(), Err(DriverError::Closed { .. })));
        assert!(matches!(rows.metadata(), Err(DriverError::Closed { .. })));
        assert!(matches!(rows.was_null(), Err(DriverError::Closed { .. })));
        assert!(matches!(rows.get_string(1), Err(DriverError::Closed { .. })));
        assert!(matches!(rows.get_big_decimal(1), Err(DriverError::Closed { .. })));
    }

    #[test]
    fn test_drop_closes_once() {
        let events = EventLog::new();
        {
            let mut rows = people_iterator(&events);
            assert!(rows.next().unwrap());
        }
        assert_eq!(
            events.events(),
            vec!["cursor.close", "statement.close", "session.release"]
        );

        let events = EventLog::new();
        {
            let mut rows = people_iterator(&events);
            rows.close();
        }
        assert_eq!(events.count("session.release"), 1, "Drop after close must not release again");
    }

    #[test]
    fn test_open_failure_releases_statement_and_session() {
        let events = EventLog::new();
        let statement = ScriptedStatement::new().with_events(events.clone());
        let result: Result<Scripted> = RowIterator::open(statement, events.hook(), |_| {
            Err(ScriptedFault("no such table: missing".to_string()))
        });

        let err = result.expect_err("Open should fail");
        assert_eq!(err.to_string(), "no such table: missing");
        assert_eq!(events.events(), vec!["statement.close", "session.release"]);
    }

    #[test]
    fn test_open_success_builds_iterator() {
        let events = EventLog::new();
        let statement = ScriptedStatement::new().with_events(events.clone());
        let cursor_events = events.clone();
        let mut rows: Scripted = RowIterator::open(statement, events.hook(), move |_| {
            Ok::<_, ScriptedFault>(
                ScriptedCursor::with_names(&["id", "name"], people()).with_events(cursor_events),
            )
        })
        .unwrap();

        assert!(rows.next().unwrap());
        assert!(events.events().is_empty(), "Nothing should be released while open");
        rows.close();
        assert_eq!(events.count("session.release"), 1);
    }
}
