///
/// # Column Metadata
///
/// `ColumnDescriptor` is the static description of one result column, built
/// by a driver from whatever its native result metadata offers. `MetadataView`
/// is the read-only, 1-based projection over the descriptor set that callers
/// see through `RowIterator::metadata()`.
///
/// ## Type Codes
///
/// `SqlType` carries the declared column type using the conventional
/// `java.sql.Types` integer codes, which most SQL drivers and wire protocols
/// already speak. Codes this crate does not name round-trip through
/// `SqlType::Vendor`.
///
/// ## Snapshot Semantics
///
/// A view is an immutable snapshot shared behind an `Arc`. The iterator takes
/// it once from the live cursor and hands out clones, so metadata requested
/// before the first row is identical to metadata requested mid-iteration.
///

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{DriverError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Null,
    Other,
    Blob,
    Clob,
    Boolean,
    Vendor(i32),
}

impl SqlType {
    pub fn code(self) -> i32 {
        match self {
            SqlType::Bit => -7,
            SqlType::TinyInt => -6,
            SqlType::SmallInt => 5,
            SqlType::Integer => 4,
            SqlType::BigInt => -5,
            SqlType::Float => 6,
            SqlType::Real => 7,
            SqlType::Double => 8,
            SqlType::Numeric => 2,
            SqlType::Decimal => 3,
            SqlType::Char => 1,
            SqlType::VarChar => 12,
            SqlType::LongVarChar => -1,
            SqlType::Date => 91,
            SqlType::Time => 92,
            SqlType::Timestamp => 93,
            SqlType::Binary => -2,
            SqlType::VarBinary => -3,
            SqlType::LongVarBinary => -4,
            SqlType::Null => 0,
            SqlType::Other => 1111,
            SqlType::Blob => 2004,
            SqlType::Clob => 2005,
            SqlType::Boolean => 16,
            SqlType::Vendor(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            -7 => SqlType::Bit,
            -6 => SqlType::TinyInt,
            5 => SqlType::SmallInt,
            4 => SqlType::Integer,
            -5 => SqlType::BigInt,
            6 => SqlType::Float,
            7 => SqlType::Real,
            8 => SqlType::Double,
            2 => SqlType::Numeric,
            3 => SqlType::Decimal,
            1 => SqlType::Char,
            12 => SqlType::VarChar,
            -1 => SqlType::LongVarChar,
            91 => SqlType::Date,
            92 => SqlType::Time,
            93 => SqlType::Timestamp,
            -2 => SqlType::Binary,
            -3 => SqlType::VarBinary,
            -4 => SqlType::LongVarBinary,
            0 => SqlType::Null,
            1111 => SqlType::Other,
            2004 => SqlType::Blob,
            2005 => SqlType::Clob,
            16 => SqlType::Boolean,
            other => SqlType::Vendor(other),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SqlType::Bit
                | SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
                | SqlType::Float
                | SqlType::Real
                | SqlType::Double
                | SqlType::Numeric
                | SqlType::Decimal
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Vendor(code) => write!(f, "VENDOR({})", code),
            other => write!(f, "{}", format!("{:?}", other).to_uppercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl Nullability {
    pub fn code(self) -> i32 {
        match self {
            Nullability::NoNulls => 0,
            Nullability::Nullable => 1,
            Nullability::Unknown => 2,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Nullability::NoNulls,
            1 => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub label: String,
    pub table_name: String,
    pub schema_name: String,
    pub sql_type: SqlType,
    pub type_name: String,
    pub display_size: u32,
    pub precision: u32,
    pub scale: i32,
    pub nullability: Nullability,
    pub auto_increment: bool,
    pub case_sensitive: bool,
    pub signed: bool,
}

impl ColumnDescriptor {
    /// Descriptor with the label defaulted to the name and everything else
    /// unknown or zero.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            table_name: String::new(),
            schema_name: String::new(),
            sql_type,
            type_name: String::new(),
            display_size: 0,
            precision: 0,
            scale: 0,
            nullability: Nullability::Unknown,
            auto_increment: false,
            case_sensitive: false,
            signed: sql_type.is_numeric(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_origin(mut self, schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self.table_name = table_name.into();
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn with_size(mut self, display_size: u32, precision: u32, scale: i32) -> Self {
        self.display_size = display_size;
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn with_nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    pub fn with_flags(mut self, auto_increment: bool, case_sensitive: bool, signed: bool) -> Self {
        self.auto_increment = auto_increment;
        self.case_sensitive = case_sensitive;
        self.signed = signed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataView {
    columns: Arc<[ColumnDescriptor]>,
}

impl MetadataView {
    pub fn new(columns: impl Into<Arc<[ColumnDescriptor]>>) -> Self {
        Self {
            columns: columns.into(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Descriptor at 1-based `column`.
    pub fn descriptor(&self, column: usize) -> Result<&ColumnDescriptor> {
        column
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .ok_or(DriverError::ColumnIndex {
                column,
                count: self.columns.len(),
            })
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter()
    }

    /// 1-based index of the first column whose name matches, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
    }

    pub fn column_name(&self, column: usize) -> Result<&str> {
        Ok(&self.descriptor(column)?.name)
    }

    pub fn column_label(&self, column: usize) -> Result<&str> {
        Ok(&self.descriptor(column)?.label)
    }

    pub fn table_name(&self, column: usize) -> Result<&str> {
        Ok(&self.descriptor(column)?.table_name)
    }

    pub fn schema_name(&self, column: usize) -> Result<&str> {
        Ok(&self.descriptor(column)?.schema_name)
    }

    pub fn column_type(&self, column: usize) -> Result<SqlType> {
        Ok(self.descriptor(column)?.sql_type)
    }

    pub fn column_type_name(&self, column: usize) -> Result<&str> {
        Ok(&self.descriptor(column)?.type_name)
    }

    pub fn column_display_size(&self, column: usize) -> Result<u32> {
        Ok(self.descriptor(column)?.display_size)
    }

    pub fn precision(&self, column: usize) -> Result<u32> {
        Ok(self.descriptor(column)?.precision)
    }

    pub fn scale(&self, column: usize) -> Result<i32> {
        Ok(self.descriptor(column)?.scale)
    }

    pub fn is_nullable(&self, column: usize) -> Result<Nullability> {
        Ok(self.descriptor(column)?.nullability)
    }

    pub fn is_auto_increment(&self, column: usize) -> Result<bool> {
        Ok(self.descriptor(column)?.auto_increment)
    }

    pub fn is_case_sensitive(&self, column: usize) -> Result<bool> {
        Ok(self.descriptor(column)?.case_sensitive)
    }

    pub fn is_signed(&self, column: usize) -> Result<bool> {
        Ok(self.descriptor(column)?.signed)
    }
}
