///
/// Driver-facing traits.
///
/// A driver adapter implements `Cursor` for its positioned result and
/// `Statement` for the statement that produced it. `RowIterator` owns one of
/// each and relays every call, turning `Fault` values into `DriverError`.
///
/// Column indices are 1-based. Getters for primitive types return the type's
/// zero value when the column is SQL NULL; callers tell the two apart with
/// `was_null`. Getters for reference types return `None` for NULL.
///
/// Conversions are the driver's own. An adapter should report a fault for a
/// bad index, a getter call with no current row, or a value its native rules
/// cannot convert to the requested type.
///

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::metadata::ColumnDescriptor;
use crate::value::{ByteStream, Value};

pub trait Cursor {
    type Fault: fmt::Display;

    /// Column descriptors in column order. Must not depend on row position.
    fn metadata(&self) -> Result<Vec<ColumnDescriptor>, Self::Fault>;

    /// Advance to the next row. `false` once exhausted, on every later call too.
    fn next(&mut self) -> Result<bool, Self::Fault>;

    /// Whether the last value read by a getter was SQL NULL.
    fn was_null(&self) -> Result<bool, Self::Fault>;

    fn get_string(&mut self, column: usize) -> Result<Option<String>, Self::Fault>;
    fn get_boolean(&mut self, column: usize) -> Result<bool, Self::Fault>;
    fn get_byte(&mut self, column: usize) -> Result<i8, Self::Fault>;
    fn get_short(&mut self, column: usize) -> Result<i16, Self::Fault>;
    fn get_int(&mut self, column: usize) -> Result<i32, Self::Fault>;
    fn get_long(&mut self, column: usize) -> Result<i64, Self::Fault>;
    fn get_float(&mut self, column: usize) -> Result<f32, Self::Fault>;
    fn get_double(&mut self, column: usize) -> Result<f64, Self::Fault>;
    fn get_bytes(&mut self, column: usize) -> Result<Option<Vec<u8>>, Self::Fault>;
    fn get_date(&mut self, column: usize) -> Result<Option<NaiveDate>, Self::Fault>;
    fn get_time(&mut self, column: usize) -> Result<Option<NaiveTime>, Self::Fault>;
    fn get_timestamp(&mut self, column: usize) -> Result<Option<NaiveDateTime>, Self::Fault>;
    fn get_ascii_stream(&mut self, column: usize) -> Result<Option<ByteStream>, Self::Fault>;
    fn get_binary_stream(&mut self, column: usize) -> Result<Option<ByteStream>, Self::Fault>;
    fn get_object(&mut self, column: usize) -> Result<Value, Self::Fault>;
    fn get_big_decimal(&mut self, column: usize) -> Result<Option<BigDecimal>, Self::Fault>;

    /// Release the driver cursor. Called at most once, before the statement closes.
    fn close(&mut self) -> Result<(), Self::Fault>;
}

pub trait Statement {
    type Fault: fmt::Display;

    /// Release the driver statement. Called at most once, after the cursor closes.
    fn close(&mut self) -> Result<(), Self::Fault>;
}
