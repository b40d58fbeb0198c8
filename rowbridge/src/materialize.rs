///
/// Drains a row iterator into name/value maps.
///
/// Keys are column names, not labels. When a result repeats a column name
/// the later column's value wins and the key keeps the position of its first
/// occurrence. The iterator is left open; closing it is the caller's job.
///

use indexmap::IndexMap;

use crate::cursor::{Cursor, Statement};
use crate::error::Result;
use crate::iterator::RowIterator;
use crate::value::Value;

pub type RowMap = IndexMap<String, Value>;

pub fn materialize<C: Cursor, S: Statement>(rows: &mut RowIterator<C, S>) -> Result<Vec<RowMap>> {
    let metadata = rows.metadata()?;
    let column_count = metadata.column_count();
    let mut result = Vec::new();

    while rows.next()? {
        let mut row = RowMap::with_capacity(column_count);
        for column in 1..=column_count {
            row.insert(metadata.column_name(column)?.to_string(), rows.get_object(column)?);
        }
        result.push(row);
    }

    Ok(result)
}
