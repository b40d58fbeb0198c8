///
/// Forward-only cursor over a running SQLite statement.
///
/// Each `next` steps the statement once and copies the new row's values out
/// of rusqlite's borrowed `Row`, so getters can be called in any order and
/// any number of times on the current row. Column descriptors are taken from
/// the statement when the cursor opens, which keeps metadata available after
/// the statement has stepped past its last row.
///
/// `was_null` is `false` until a getter has run on the current row.
///

use std::io;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rowbridge::{ByteStream, ColumnDescriptor, Cursor, Value};
use rusqlite::Rows;
use rusqlite::types::Value as SqlValue;

use crate::convert;
use crate::errors::SqliteFault;

pub struct SqliteCursor<'conn> {
    rows: Option<Rows<'conn>>,
    columns: Vec<ColumnDescriptor>,
    current: Option<Vec<SqlValue>>,
    exhausted: bool,
    last_null: bool,
}

impl<'conn> SqliteCursor<'conn> {
    pub(crate) fn new(rows: Rows<'conn>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            rows: Some(rows),
            columns,
            current: None,
            exhausted: false,
            last_null: false,
        }
    }

    fn value(&mut self, column: usize) -> Result<&SqlValue, SqliteFault> {
        if self.rows.is_none() {
            return Err(SqliteFault::Closed);
        }
        let row = self.current.as_ref().ok_or(SqliteFault::NoCurrentRow)?;
        let count = self.columns.len();
        if column == 0 || column > count {
            return Err(SqliteFault::ColumnIndex { column, count });
        }
        let value = &row[column - 1];
        self.last_null = matches!(value, SqlValue::Null);
        Ok(value)
    }
}

impl Cursor for SqliteCursor<'_> {
    type Fault = SqliteFault;

    fn metadata(&self) -> Result<Vec<ColumnDescriptor>, SqliteFault> {
        if self.rows.is_none() {
            return Err(SqliteFault::Closed);
        }
        Ok(self.columns.clone())
    }

    fn next(&mut self) -> Result<bool, SqliteFault> {
        let rows = self.rows.as_mut().ok_or(SqliteFault::Closed)?;
        self.last_null = false;
        if self.exhausted {
            return Ok(false);
        }
        match rows.next()? {
            Some(row) => {
                let values = (0..self.columns.len())
                    .map(|i| row.get_ref(i).map(SqlValue::from))
                    .collect::<Result<Vec<_>, _>>()?;
                self.current = Some(values);
                Ok(true)
            }
            None => {
                self.current = None;
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn was_null(&self) -> Result<bool, SqliteFault> {
        if self.rows.is_none() {
            return Err(SqliteFault::Closed);
        }
        Ok(self.last_null)
    }

    fn get_string(&mut self, column: usize) -> Result<Option<String>, SqliteFault> {
        convert::to_text(self.value(column)?)
    }

    fn get_boolean(&mut self, column: usize) -> Result<bool, SqliteFault> {
        convert::to_bool(self.value(column)?)
    }

    fn get_byte(&mut self, column: usize) -> Result<i8, SqliteFault> {
        convert::narrow(convert::to_i64(self.value(column)?)?, "i8")
    }

    fn get_short(&mut self, column: usize) -> Result<i16, SqliteFault> {
        convert::narrow(convert::to_i64(self.value(column)?)?, "i16")
    }

    fn get_int(&mut self, column: usize) -> Result<i32, SqliteFault> {
        convert::narrow(convert::to_i64(self.value(column)?)?, "i32")
    }

    fn get_long(&mut self, column: usize) -> Result<i64, SqliteFault> {
        convert::to_i64(self.value(column)?)
    }

    fn get_float(&mut self, column: usize) -> Result<f32, SqliteFault> {
        Ok(convert::to_f64(self.value(column)?)? as f32)
    }

    fn get_double(&mut self, column: usize) -> Result<f64, SqliteFault> {
        convert::to_f64(self.value(column)?)
    }

    fn get_bytes(&mut self, column: usize) -> Result<Option<Vec<u8>>, SqliteFault> {
        convert::to_bytes(self.value(column)?)
    }

    fn get_date(&mut self, column: usize) -> Result<Option<NaiveDate>, SqliteFault> {
        convert::to_date(self.value(column)?)
    }

    fn get_time(&mut self, column: usize) -> Result<Option<NaiveTime>, SqliteFault> {
        convert::to_time(self.value(column)?)
    }

    fn get_timestamp(&mut self, column: usize) -> Result<Option<NaiveDateTime>, SqliteFault> {
        convert::to_timestamp(self.value(column)?)
    }

    fn get_ascii_stream(&mut self, column: usize) -> Result<Option<ByteStream>, SqliteFault> {
        Ok(convert::to_text(self.value(column)?)?
            .map(|s| Box::new(io::Cursor::new(s.into_bytes())) as ByteStream))
    }

    fn get_binary_stream(&mut self, column: usize) -> Result<Option<ByteStream>, SqliteFault> {
        Ok(convert::to_bytes(self.value(column)?)?
            .map(|b| Box::new(io::Cursor::new(b)) as ByteStream))
    }

    fn get_object(&mut self, column: usize) -> Result<Value, SqliteFault> {
        Ok(convert::to_object(self.value(column)?))
    }

    fn get_big_decimal(&mut self, column: usize) -> Result<Option<BigDecimal>, SqliteFault> {
        convert::to_decimal(self.value(column)?)
    }

    fn close(&mut self) -> Result<(), SqliteFault> {
        // Dropping `Rows` resets the statement.
        self.rows = None;
        self.current = None;
        Ok(())
    }
}
