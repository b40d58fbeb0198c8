///
/// SQLite value conversions.
///
/// Follows SQLite's own column accessors: any storage class reads as text,
/// numbers read across integer/real, and text reads as a number only when it
/// parses as one. Narrowing conversions are range checked. Dates and times
/// go through rusqlite's chrono `FromSql` impls, which accept the ISO-8601
/// text forms SQLite's date functions produce. Integers read as timestamps
/// are Unix seconds.
///

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rowbridge::Value;
use rusqlite::types::{FromSql, Value as SqlValue, ValueRef};

use crate::errors::SqliteFault;

pub(crate) fn storage_class(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "null",
        SqlValue::Integer(_) => "integer",
        SqlValue::Real(_) => "real",
        SqlValue::Text(_) => "text",
        SqlValue::Blob(_) => "blob",
    }
}

fn conversion(value: &SqlValue, to: &'static str, reason: impl ToString) -> SqliteFault {
    SqliteFault::Conversion {
        from: storage_class(value),
        to,
        reason: reason.to_string(),
    }
}

pub(crate) fn to_text(value: &SqlValue) -> Result<Option<String>, SqliteFault> {
    Ok(match value {
        SqlValue::Null => None,
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(real_to_text(*f)),
        SqlValue::Text(s) => Some(s.clone()),
        SqlValue::Blob(b) => Some(
            String::from_utf8(b.clone()).map_err(|e| conversion(value, "string", e))?,
        ),
    })
}

/// Renders a REAL the way SQLite's `CAST(x AS TEXT)` does: 15 significant
/// digits, exponent form outside `1e-4..1e15`, and always a decimal point.
pub(crate) fn real_to_text(f: f64) -> String {
    if f.is_infinite() {
        return if f > 0.0 { "Inf".to_string() } else { "-Inf".to_string() };
    }
    if f == 0.0 {
        return "0.0".to_string();
    }
    let sci = format!("{:.14e}", f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if !(-4..15).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", with_point(mantissa), sign, exp.abs())
    } else {
        let decimals = (14 - exp) as usize;
        with_point(&format!("{:.*}", decimals, f))
    }
}

fn with_point(digits: &str) -> String {
    let trimmed = if digits.contains('.') {
        digits.trim_end_matches('0')
    } else {
        digits
    };
    match trimmed.strip_suffix('.') {
        Some(whole) => format!("{}.0", whole),
        None if !trimmed.contains('.') => format!("{}.0", trimmed),
        None => trimmed.to_string(),
    }
}

pub(crate) fn to_i64(value: &SqlValue) -> Result<i64, SqliteFault> {
    match value {
        SqlValue::Null => Ok(0),
        SqlValue::Integer(i) => Ok(*i),
        SqlValue::Real(f) => Ok(*f as i64),
        SqlValue::Text(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .or_else(|_| t.parse::<f64>().map(|f| f as i64))
                .map_err(|_| conversion(value, "integer", format!("'{}' is not a number", s)))
        }
        SqlValue::Blob(_) => Err(conversion(value, "integer", "blob has no numeric value")),
    }
}

pub(crate) fn narrow<T: TryFrom<i64>>(value: i64, to: &'static str) -> Result<T, SqliteFault> {
    T::try_from(value).map_err(|_| SqliteFault::Conversion {
        from: "integer",
        to,
        reason: format!("{} is out of range", value),
    })
}

pub(crate) fn to_f64(value: &SqlValue) -> Result<f64, SqliteFault> {
    match value {
        SqlValue::Null => Ok(0.0),
        SqlValue::Integer(i) => Ok(*i as f64),
        SqlValue::Real(f) => Ok(*f),
        SqlValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| conversion(value, "real", format!("'{}' is not a number", s))),
        SqlValue::Blob(_) => Err(conversion(value, "real", "blob has no numeric value")),
    }
}

pub(crate) fn to_bool(value: &SqlValue) -> Result<bool, SqliteFault> {
    match value {
        SqlValue::Null => Ok(false),
        SqlValue::Integer(i) => Ok(*i != 0),
        SqlValue::Real(f) => Ok(*f != 0.0),
        SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => to_f64(value).map(|f| f != 0.0),
        },
        SqlValue::Blob(_) => Err(conversion(value, "boolean", "blob has no truth value")),
    }
}

pub(crate) fn to_bytes(value: &SqlValue) -> Result<Option<Vec<u8>>, SqliteFault> {
    Ok(match value {
        SqlValue::Null => None,
        SqlValue::Blob(b) => Some(b.clone()),
        other => to_text(other)?.map(String::into_bytes),
    })
}

fn from_sql<T: FromSql>(value: &SqlValue, to: &'static str) -> Result<Option<T>, SqliteFault> {
    match value {
        SqlValue::Null => Ok(None),
        other => T::column_result(ValueRef::from(other))
            .map(Some)
            .map_err(|e| conversion(other, to, e)),
    }
}

pub(crate) fn to_date(value: &SqlValue) -> Result<Option<NaiveDate>, SqliteFault> {
    match value {
        SqlValue::Text(s) if s.len() > 10 => to_timestamp(value)
            .map(|ts| ts.map(|ts| ts.date()))
            .map_err(|_| conversion(value, "date", format!("'{}' is not a date", s))),
        SqlValue::Integer(_) => Ok(to_timestamp(value)?.map(|ts| ts.date())),
        _ => from_sql(value, "date"),
    }
}

pub(crate) fn to_time(value: &SqlValue) -> Result<Option<NaiveTime>, SqliteFault> {
    match value {
        SqlValue::Text(s) if s.len() > 12 && s.as_bytes().get(4) == Some(&b'-') => {
            Ok(to_timestamp(value)?.map(|ts| ts.time()))
        }
        SqlValue::Integer(_) => Ok(to_timestamp(value)?.map(|ts| ts.time())),
        _ => from_sql(value, "time"),
    }
}

pub(crate) fn to_timestamp(value: &SqlValue) -> Result<Option<NaiveDateTime>, SqliteFault> {
    match value {
        SqlValue::Integer(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| Some(dt.naive_utc()))
            .ok_or_else(|| conversion(value, "timestamp", format!("{} is out of range", secs))),
        SqlValue::Text(s) if s.len() == 10 => NaiveDate::from_str(s)
            .map(|d| Some(d.and_time(NaiveTime::MIN)))
            .map_err(|e| conversion(value, "timestamp", e)),
        _ => from_sql(value, "timestamp"),
    }
}

pub(crate) fn to_decimal(value: &SqlValue) -> Result<Option<BigDecimal>, SqliteFault> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(i) => Ok(Some(BigDecimal::from(*i))),
        SqlValue::Real(f) => BigDecimal::from_str(&f.to_string())
            .map(Some)
            .map_err(|e| conversion(value, "decimal", e)),
        SqlValue::Text(s) => BigDecimal::from_str(s.trim())
            .map(Some)
            .map_err(|_| conversion(value, "decimal", format!("'{}' is not a number", s))),
        SqlValue::Blob(_) => Err(conversion(value, "decimal", "blob has no numeric value")),
    }
}

pub(crate) fn to_object(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Integer(*i),
        SqlValue::Real(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Bytes(b.clone()),
    }
}
