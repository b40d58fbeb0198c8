///
/// # Scripted Driver
///
/// An in-memory driver for exercising `RowIterator` without a database.
/// Rows are plain `Value` vectors; faults can be injected into `next`,
/// `metadata` and both close steps. Cursor, statement and any session hook
/// built with `EventLog::hook` append to a shared `EventLog`, so tests can
/// assert teardown order.
///
/// Conversion rules are deliberately small: numbers convert between each
/// other, text parses into numbers/booleans/dates, and anything else is a
/// fault.
///

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::cursor::{Cursor, Statement};
use crate::metadata::{ColumnDescriptor, SqlType};
use crate::session::SessionHook;
use crate::value::{ByteStream, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedFault(pub String);

impl fmt::Display for ScriptedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn fault<T>(message: impl Into<String>) -> Result<T, ScriptedFault> {
    Err(ScriptedFault(message.into()))
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: impl Into<String>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.into());
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    /// Session hook that records `session.release`.
    pub fn hook(&self) -> SessionHook {
        let log = self.clone();
        SessionHook::new(move || log.record("session.release"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    OnRow(usize),
    Exhausted,
}

#[derive(Debug)]
pub struct ScriptedCursor {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
    position: Position,
    next_calls: usize,
    fail_next_at: Option<(usize, String)>,
    fail_metadata: Option<String>,
    fail_close: Option<String>,
    last_null: bool,
    closed: bool,
    events: EventLog,
}

impl ScriptedCursor {
    pub fn new(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: Position::BeforeFirst,
            next_calls: 0,
            fail_next_at: None,
            fail_metadata: None,
            fail_close: None,
            last_null: false,
            closed: false,
            events: EventLog::new(),
        }
    }

    /// Columns typed as `VARCHAR`, named in order.
    pub fn with_names(names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = names
            .iter()
            .map(|n| ColumnDescriptor::new(*n, SqlType::VarChar))
            .collect();
        Self::new(columns, rows)
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Fail the `call`-th invocation of `next` (1-based).
    pub fn fail_next_at(mut self, call: usize, message: impl Into<String>) -> Self {
        self.fail_next_at = Some((call, message.into()));
        self
    }

    pub fn fail_metadata(mut self, message: impl Into<String>) -> Self {
        self.fail_metadata = Some(message.into());
        self
    }

    pub fn fail_close(mut self, message: impl Into<String>) -> Self {
        self.fail_close = Some(message.into());
        self
    }

    fn value(&mut self, column: usize) -> Result<Value, ScriptedFault> {
        if self.closed {
            return fault("cursor is closed");
        }
        let Position::OnRow(row) = self.position else {
            return fault("cursor is not positioned on a row");
        };
        let count = self.columns.len();
        if column == 0 || column > count {
            return fault(format!("column index {} out of range 1..={}", column, count));
        }
        let value = self.rows[row].get(column - 1).cloned().unwrap_or(Value::Null);
        self.last_null = value.is_null();
        Ok(value)
    }

    fn number(&mut self, column: usize) -> Result<f64, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(0.0),
            Value::Integer(i) => Ok(i as f64),
            Value::Double(d) => Ok(d),
            Value::Boolean(b) => Ok(if b { 1.0 } else { 0.0 }),
            Value::Decimal(d) => d.to_f64().map_or_else(|| fault("decimal out of range"), Ok),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .or_else(|_| fault(format!("cannot convert '{}' to a number", s))),
            other => fault(format!("cannot convert {} to a number", other.type_name())),
        }
    }

    fn integral<T: TryFrom<i64>>(&mut self, column: usize, target: &str) -> Result<T, ScriptedFault> {
        let wide = self.get_long(column)?;
        T::try_from(wide).or_else(|_| fault(format!("value {} out of range for {}", wide, target)))
    }
}

impl Cursor for ScriptedCursor {
    type Fault = ScriptedFault;

    fn metadata(&self) -> Result<Vec<ColumnDescriptor>, ScriptedFault> {
        if self.closed {
            return fault("cursor is closed");
        }
        if let Some(message) = &self.fail_metadata {
            return fault(message.clone());
        }
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> Result<bool, ScriptedFault> {
        if self.closed {
            return fault("cursor is closed");
        }
        self.next_calls += 1;
        if let Some((call, message)) = &self.fail_next_at {
            if *call == self.next_calls {
                return fault(message.clone());
            }
        }
        self.last_null = false;
        self.position = match self.position {
            Position::BeforeFirst if !self.rows.is_empty() => Position::OnRow(0),
            Position::OnRow(row) if row + 1 < self.rows.len() => Position::OnRow(row + 1),
            _ => Position::Exhausted,
        };
        Ok(matches!(self.position, Position::OnRow(_)))
    }

    fn was_null(&self) -> Result<bool, ScriptedFault> {
        if self.closed {
            return fault("cursor is closed");
        }
        Ok(self.last_null)
    }

    fn get_string(&mut self, column: usize) -> Result<Option<String>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            Value::Integer(i) => Ok(Some(i.to_string())),
            Value::Double(d) => Ok(Some(d.to_string())),
            Value::Boolean(b) => Ok(Some(b.to_string())),
            Value::Decimal(d) => Ok(Some(d.to_string())),
            Value::Date(d) => Ok(Some(d.to_string())),
            Value::Time(t) => Ok(Some(t.to_string())),
            Value::Timestamp(ts) => Ok(Some(ts.to_string())),
            Value::Bytes(_) => fault("cannot convert bytes to a string"),
        }
    }

    fn get_boolean(&mut self, column: usize) -> Result<bool, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(b),
            Value::Integer(i) => Ok(i != 0),
            Value::Text(s) => match s.trim() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => fault(format!("cannot convert '{}' to a boolean", s)),
            },
            other => fault(format!("cannot convert {} to a boolean", other.type_name())),
        }
    }

    fn get_byte(&mut self, column: usize) -> Result<i8, ScriptedFault> {
        self.integral(column, "i8")
    }

    fn get_short(&mut self, column: usize) -> Result<i16, ScriptedFault> {
        self.integral(column, "i16")
    }

    fn get_int(&mut self, column: usize) -> Result<i32, ScriptedFault> {
        self.integral(column, "i32")
    }

    fn get_long(&mut self, column: usize) -> Result<i64, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(0),
            Value::Integer(i) => Ok(i),
            Value::Boolean(b) => Ok(i64::from(b)),
            Value::Double(d) => Ok(d as i64),
            Value::Decimal(d) => d.to_i64().map_or_else(|| fault("decimal out of range"), Ok),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .or_else(|_| fault(format!("cannot convert '{}' to an integer", s))),
            other => fault(format!("cannot convert {} to an integer", other.type_name())),
        }
    }

    fn get_float(&mut self, column: usize) -> Result<f32, ScriptedFault> {
        Ok(self.number(column)? as f32)
    }

    fn get_double(&mut self, column: usize) -> Result<f64, ScriptedFault> {
        self.number(column)
    }

    fn get_bytes(&mut self, column: usize) -> Result<Option<Vec<u8>>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Bytes(b) => Ok(Some(b)),
            Value::Text(s) => Ok(Some(s.into_bytes())),
            other => fault(format!("cannot convert {} to bytes", other.type_name())),
        }
    }

    fn get_date(&mut self, column: usize) -> Result<Option<NaiveDate>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Date(d) => Ok(Some(d)),
            Value::Timestamp(ts) => Ok(Some(ts.date())),
            Value::Text(s) => NaiveDate::from_str(&s)
                .map(Some)
                .or_else(|e| fault(format!("cannot convert '{}' to a date: {}", s, e))),
            other => fault(format!("cannot convert {} to a date", other.type_name())),
        }
    }

    fn get_time(&mut self, column: usize) -> Result<Option<NaiveTime>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Time(t) => Ok(Some(t)),
            Value::Timestamp(ts) => Ok(Some(ts.time())),
            Value::Text(s) => NaiveTime::from_str(&s)
                .map(Some)
                .or_else(|e| fault(format!("cannot convert '{}' to a time: {}", s, e))),
            other => fault(format!("cannot convert {} to a time", other.type_name())),
        }
    }

    fn get_timestamp(&mut self, column: usize) -> Result<Option<NaiveDateTime>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(ts)),
            Value::Date(d) => Ok(Some(d.and_time(NaiveTime::MIN))),
            Value::Text(s) => NaiveDateTime::from_str(&s)
                .map(Some)
                .or_else(|e| fault(format!("cannot convert '{}' to a timestamp: {}", s, e))),
            other => fault(format!("cannot convert {} to a timestamp", other.type_name())),
        }
    }

    fn get_ascii_stream(&mut self, column: usize) -> Result<Option<ByteStream>, ScriptedFault> {
        Ok(self
            .get_string(column)?
            .map(|s| Box::new(io::Cursor::new(s.into_bytes())) as ByteStream))
    }

    fn get_binary_stream(&mut self, column: usize) -> Result<Option<ByteStream>, ScriptedFault> {
        Ok(self
            .get_bytes(column)?
            .map(|b| Box::new(io::Cursor::new(b)) as ByteStream))
    }

    fn get_object(&mut self, column: usize) -> Result<Value, ScriptedFault> {
        self.value(column)
    }

    fn get_big_decimal(&mut self, column: usize) -> Result<Option<BigDecimal>, ScriptedFault> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Decimal(d) => Ok(Some(d)),
            Value::Integer(i) => Ok(Some(BigDecimal::from(i))),
            Value::Double(d) => BigDecimal::from_str(&d.to_string())
                .map(Some)
                .or_else(|e| fault(e.to_string())),
            Value::Text(s) => BigDecimal::from_str(s.trim())
                .map(Some)
                .or_else(|_| fault(format!("cannot convert '{}' to a decimal", s))),
            other => fault(format!("cannot convert {} to a decimal", other.type_name())),
        }
    }

    fn close(&mut self) -> Result<(), ScriptedFault> {
        self.closed = true;
        self.events.record("cursor.close");
        match &self.fail_close {
            Some(message) => fault(message.clone()),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedStatement {
    fail_close: Option<String>,
    events: EventLog,
}

impl ScriptedStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn fail_close(mut self, message: impl Into<String>) -> Self {
        self.fail_close = Some(message.into());
        self
    }
}

impl Statement for ScriptedStatement {
    type Fault = ScriptedFault;

    fn close(&mut self) -> Result<(), ScriptedFault> {
        self.events.record("statement.close");
        match &self.fail_close {
            Some(message) => fault(message.clone()),
            None => Ok(()),
        }
    }
}
