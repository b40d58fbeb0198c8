///
/// Column descriptors from SQLite declared types.
///
/// SQLite only knows a column's declared type text (`VARCHAR(40)`,
/// `DECIMAL(10,2)`, ...), and nothing at all for expression columns. Well
/// known names map directly; everything else falls back to SQLite's own
/// affinity rules. Size arguments in parentheses become precision and scale.
/// Nullability is reported as unknown and table/schema origin as empty.
///

use rowbridge::{ColumnDescriptor, Nullability, SqlType};
use rusqlite::Statement;

pub(crate) fn describe(stmt: &Statement<'_>) -> Vec<ColumnDescriptor> {
    stmt.columns()
        .iter()
        .map(|column| descriptor_for(column.name(), column.decl_type()))
        .collect()
}

pub fn descriptor_for(name: &str, decl_type: Option<&str>) -> ColumnDescriptor {
    let decl = decl_type.unwrap_or("").trim();
    let (base, args) = split_declared_type(decl);
    let sql_type = if decl.is_empty() {
        SqlType::Other
    } else {
        sql_type_for(&base)
    };

    let (precision, scale) = match args.as_slice() {
        [p] => (*p, 0),
        [p, s, ..] => (*p, i32::try_from(*s).unwrap_or(i32::MAX)),
        [] => default_precision(sql_type),
    };
    let display_size = match sql_type {
        SqlType::Decimal | SqlType::Numeric if !args.is_empty() => precision.saturating_add(2),
        _ if !args.is_empty() => precision,
        _ => default_display_size(sql_type),
    };
    let textual = matches!(
        sql_type,
        SqlType::Char | SqlType::VarChar | SqlType::LongVarChar | SqlType::Clob
    );

    ColumnDescriptor::new(name, sql_type)
        .with_type_name(decl)
        .with_size(display_size, precision, scale)
        .with_nullability(Nullability::Unknown)
        .with_flags(false, textual, sql_type.is_numeric())
}

fn split_declared_type(decl: &str) -> (String, Vec<u32>) {
    let upper = decl.to_ascii_uppercase();
    match upper.find('(') {
        Some(open) => {
            let base = upper[..open].trim().to_string();
            let inner = upper[open + 1..].trim_end_matches(')');
            let args = inner
                .split(',')
                .filter_map(|a| a.trim().parse::<u32>().ok())
                .collect();
            (base, args)
        }
        None => (upper.trim().to_string(), Vec::new()),
    }
}

fn sql_type_for(base: &str) -> SqlType {
    match base {
        "BOOLEAN" | "BOOL" => SqlType::Boolean,
        "TINYINT" => SqlType::TinyInt,
        "SMALLINT" | "INT2" => SqlType::SmallInt,
        "INT" | "INTEGER" | "MEDIUMINT" => SqlType::Integer,
        "BIGINT" | "INT8" | "UNSIGNED BIG INT" => SqlType::BigInt,
        "DATE" => SqlType::Date,
        "TIME" => SqlType::Time,
        "DATETIME" | "TIMESTAMP" => SqlType::Timestamp,
        "DECIMAL" => SqlType::Decimal,
        "NUMERIC" => SqlType::Numeric,
        "FLOAT" => SqlType::Float,
        "REAL" => SqlType::Real,
        "DOUBLE" | "DOUBLE PRECISION" => SqlType::Double,
        "CHAR" | "CHARACTER" | "NCHAR" | "NATIVE CHARACTER" => SqlType::Char,
        "VARCHAR" | "NVARCHAR" | "VARYING CHARACTER" | "TEXT" => SqlType::VarChar,
        "CLOB" => SqlType::Clob,
        "BLOB" => SqlType::Blob,
        "BINARY" => SqlType::Binary,
        "VARBINARY" => SqlType::VarBinary,
        // SQLite affinity rules, in order.
        b if b.contains("INT") => SqlType::Integer,
        b if b.contains("CHAR") || b.contains("CLOB") || b.contains("TEXT") => SqlType::VarChar,
        b if b.contains("BLOB") => SqlType::Blob,
        b if b.contains("REAL") || b.contains("FLOA") || b.contains("DOUB") => SqlType::Double,
        _ => SqlType::Numeric,
    }
}

fn default_precision(sql_type: SqlType) -> (u32, i32) {
    match sql_type {
        SqlType::Boolean => (1, 0),
        SqlType::TinyInt => (3, 0),
        SqlType::SmallInt => (5, 0),
        SqlType::Integer => (10, 0),
        SqlType::BigInt => (19, 0),
        SqlType::Float | SqlType::Double => (15, 0),
        SqlType::Real => (7, 0),
        _ => (0, 0),
    }
}

fn default_display_size(sql_type: SqlType) -> u32 {
    match sql_type {
        SqlType::Boolean => 1,
        SqlType::TinyInt => 4,
        SqlType::SmallInt => 6,
        SqlType::Integer => 11,
        SqlType::BigInt => 20,
        SqlType::Float | SqlType::Double | SqlType::Real => 25,
        SqlType::Date => 10,
        SqlType::Time => 8,
        SqlType::Timestamp => 23,
        _ => 0,
    }
}
