//! Engine type identifiers, logical types and statement categories.

use std::fmt;

use duckdb::ffi;
use serde::{Deserialize, Serialize};

use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::take_text;

/// Type identifiers of the engine's column types.
///
/// Discriminants match the engine's C API numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TypeId {
    /// Invalid or unknown type.
    Invalid = 0,
    /// BOOLEAN
    Boolean = 1,
    /// TINYINT
    TinyInt = 2,
    /// SMALLINT
    SmallInt = 3,
    /// INTEGER
    Integer = 4,
    /// BIGINT
    BigInt = 5,
    /// UTINYINT
    UTinyInt = 6,
    /// USMALLINT
    USmallInt = 7,
    /// UINTEGER
    UInteger = 8,
    /// UBIGINT
    UBigInt = 9,
    /// FLOAT
    Float = 10,
    /// DOUBLE
    Double = 11,
    /// TIMESTAMP (microseconds)
    Timestamp = 12,
    /// DATE
    Date = 13,
    /// TIME
    Time = 14,
    /// INTERVAL
    Interval = 15,
    /// HUGEINT
    HugeInt = 16,
    /// VARCHAR
    Varchar = 17,
    /// BLOB
    Blob = 18,
    /// DECIMAL
    Decimal = 19,
    /// TIMESTAMP_S
    TimestampS = 20,
    /// TIMESTAMP_MS
    TimestampMs = 21,
    /// TIMESTAMP_NS
    TimestampNs = 22,
    /// ENUM
    Enum = 23,
    /// LIST
    List = 24,
    /// STRUCT
    Struct = 25,
    /// MAP
    Map = 26,
    /// UUID
    Uuid = 27,
    /// UNION
    Union = 28,
    /// BIT
    Bit = 29,
    /// TIME WITH TIME ZONE
    TimeTz = 30,
    /// TIMESTAMP WITH TIME ZONE
    TimestampTz = 31,
    /// UHUGEINT
    UHugeInt = 32,
    /// ARRAY
    Array = 33,
    /// ANY
    Any = 34,
    /// VARINT / BIGNUM
    VarInt = 35,
    /// SQLNULL
    SqlNull = 36,
}

impl TypeId {
    /// Convert from the engine's numeric identifier.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Boolean,
            2 => Self::TinyInt,
            3 => Self::SmallInt,
            4 => Self::Integer,
            5 => Self::BigInt,
            6 => Self::UTinyInt,
            7 => Self::USmallInt,
            8 => Self::UInteger,
            9 => Self::UBigInt,
            10 => Self::Float,
            11 => Self::Double,
            12 => Self::Timestamp,
            13 => Self::Date,
            14 => Self::Time,
            15 => Self::Interval,
            16 => Self::HugeInt,
            17 => Self::Varchar,
            18 => Self::Blob,
            19 => Self::Decimal,
            20 => Self::TimestampS,
            21 => Self::TimestampMs,
            22 => Self::TimestampNs,
            23 => Self::Enum,
            24 => Self::List,
            25 => Self::Struct,
            26 => Self::Map,
            27 => Self::Uuid,
            28 => Self::Union,
            29 => Self::Bit,
            30 => Self::TimeTz,
            31 => Self::TimestampTz,
            32 => Self::UHugeInt,
            33 => Self::Array,
            34 => Self::Any,
            35 => Self::VarInt,
            36 => Self::SqlNull,
            _ => Self::Invalid,
        }
    }

    /// The engine's numeric identifier.
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    /// SQL name of the type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Boolean => "BOOLEAN",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::UTinyInt => "UTINYINT",
            Self::USmallInt => "USMALLINT",
            Self::UInteger => "UINTEGER",
            Self::UBigInt => "UBIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Interval => "INTERVAL",
            Self::HugeInt => "HUGEINT",
            Self::Varchar => "VARCHAR",
            Self::Blob => "BLOB",
            Self::Decimal => "DECIMAL",
            Self::TimestampS => "TIMESTAMP_S",
            Self::TimestampMs => "TIMESTAMP_MS",
            Self::TimestampNs => "TIMESTAMP_NS",
            Self::Enum => "ENUM",
            Self::List => "LIST",
            Self::Struct => "STRUCT",
            Self::Map => "MAP",
            Self::Uuid => "UUID",
            Self::Union => "UNION",
            Self::Bit => "BIT",
            Self::TimeTz => "TIMETZ",
            Self::TimestampTz => "TIMESTAMPTZ",
            Self::UHugeInt => "UHUGEINT",
            Self::Array => "ARRAY",
            Self::Any => "ANY",
            Self::VarInt => "VARINT",
            Self::SqlNull => "SQLNULL",
        }
    }

    /// Whether the type nests other types.
    pub fn is_nested(self) -> bool {
        matches!(self, Self::List | Self::Struct | Self::Map | Self::Array)
    }

    /// Whether chunk vectors of this type can be read.
    pub fn is_readable(self) -> bool {
        !matches!(
            self,
            Self::Invalid | Self::Union | Self::Bit | Self::Any | Self::VarInt | Self::SqlNull
        )
    }

    /// Whether chunk vectors of this type can be written.
    pub fn is_writable(self) -> bool {
        self.is_readable() && !self.is_nested() && self != Self::Enum
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An owned engine logical type.
pub struct LogicalType {
    raw: ffi::duckdb_logical_type,
}

// SAFETY: logical types are immutable once created.
unsafe impl Send for LogicalType {}

impl LogicalType {
    /// Create a logical type for a non-parameterized type id.
    pub fn new(id: TypeId) -> Self {
        Self {
            raw: unsafe { ffi::duckdb_create_logical_type(id.as_raw() as _) },
        }
    }

    /// Create a `DECIMAL(width, scale)` type.
    pub fn decimal(width: u8, scale: u8) -> Self {
        Self {
            raw: unsafe { ffi::duckdb_create_decimal_type(width, scale) },
        }
    }

    pub(crate) fn from_raw(raw: ffi::duckdb_logical_type) -> Self {
        Self { raw }
    }

    pub(crate) fn raw(&self) -> ffi::duckdb_logical_type {
        self.raw
    }

    /// The type id.
    pub fn id(&self) -> TypeId {
        TypeId::from_raw(unsafe { ffi::duckdb_get_type_id(self.raw) } as u32)
    }

    /// Width of a DECIMAL type.
    pub fn decimal_width(&self) -> u8 {
        unsafe { ffi::duckdb_decimal_width(self.raw) }
    }

    /// Scale of a DECIMAL type.
    pub fn decimal_scale(&self) -> u8 {
        unsafe { ffi::duckdb_decimal_scale(self.raw) }
    }

    /// Physical storage type of a DECIMAL type.
    pub fn decimal_internal_type(&self) -> TypeId {
        TypeId::from_raw(unsafe { ffi::duckdb_decimal_internal_type(self.raw) } as u32)
    }

    /// Physical storage type of an ENUM type.
    pub fn enum_internal_type(&self) -> TypeId {
        TypeId::from_raw(unsafe { ffi::duckdb_enum_internal_type(self.raw) } as u32)
    }

    /// Dictionary of an ENUM type.
    pub fn enum_dictionary(&self) -> Vec<String> {
        let size = unsafe { ffi::duckdb_enum_dictionary_size(self.raw) };
        (0..size)
            .map(|i| {
                unsafe { take_text(ffi::duckdb_enum_dictionary_value(self.raw, i as _)) }
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Field names of a STRUCT type.
    pub fn struct_field_names(&self) -> Vec<String> {
        let count = unsafe { ffi::duckdb_struct_type_child_count(self.raw) };
        (0..count)
            .map(|i| {
                unsafe { take_text(ffi::duckdb_struct_type_child_name(self.raw, i)) }
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Fixed size of an ARRAY type.
    pub fn array_size(&self) -> usize {
        unsafe { ffi::duckdb_array_type_array_size(self.raw) as usize }
    }

    /// Rendering such as `DECIMAL(18,3)` for diagnostics.
    pub fn describe(&self) -> String {
        match self.id() {
            TypeId::Decimal => format!("DECIMAL({},{})", self.decimal_width(), self.decimal_scale()),
            id => id.name().to_string(),
        }
    }

    /// Fail with `UnsupportedType` unless the type can be used in a chunk.
    pub(crate) fn check_supported(&self, for_write: bool, index: usize) -> DuckDbResult<()> {
        let id = self.id();
        let supported = if for_write {
            id.is_writable()
        } else {
            id.is_readable()
        };
        if supported {
            Ok(())
        } else {
            Err(DuckDbError::unsupported(id.name(), index))
        }
    }
}

impl Drop for LogicalType {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_logical_type(&mut self.raw) };
    }
}

impl fmt::Debug for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogicalType").field(&self.describe()).finish()
    }
}

/// Category of a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StatementType {
    Invalid,
    Select,
    Insert,
    Update,
    Explain,
    Delete,
    Prepare,
    Create,
    Execute,
    Alter,
    Transaction,
    Copy,
    Analyze,
    VariableSet,
    CreateFunc,
    Drop,
    Export,
    Pragma,
    Vacuum,
    Call,
    Set,
    Load,
    Relation,
    Extension,
    LogicalPlan,
    Attach,
    Detach,
    Multi,
}

impl StatementType {
    /// Convert from the engine's numeric identifier.
    pub fn from_raw(raw: u32) -> Self {
        const ORDER: [StatementType; 28] = [
            StatementType::Invalid,
            StatementType::Select,
            StatementType::Insert,
            StatementType::Update,
            StatementType::Explain,
            StatementType::Delete,
            StatementType::Prepare,
            StatementType::Create,
            StatementType::Execute,
            StatementType::Alter,
            StatementType::Transaction,
            StatementType::Copy,
            StatementType::Analyze,
            StatementType::VariableSet,
            StatementType::CreateFunc,
            StatementType::Drop,
            StatementType::Export,
            StatementType::Pragma,
            StatementType::Vacuum,
            StatementType::Call,
            StatementType::Set,
            StatementType::Load,
            StatementType::Relation,
            StatementType::Extension,
            StatementType::LogicalPlan,
            StatementType::Attach,
            StatementType::Detach,
            StatementType::Multi,
        ];
        ORDER
            .get(raw as usize)
            .copied()
            .unwrap_or(StatementType::Invalid)
    }

    /// Whether the statement produces rows rather than a change count.
    pub fn returns_rows(self) -> bool {
        matches!(
            self,
            Self::Select | Self::Explain | Self::Pragma | Self::Call | Self::Relation
        )
    }
}

/// A calendar interval: months, days and microseconds are kept apart because
/// their lengths are not fixed relative to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Whole months.
    pub months: i32,
    /// Whole days.
    pub days: i32,
    /// Microseconds.
    pub micros: i64,
}

impl Interval {
    /// Create an interval.
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} months {} days {} microseconds",
            self.months, self.days, self.micros
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_roundtrip() {
        for raw in 0..=36 {
            assert_eq!(TypeId::from_raw(raw).as_raw(), raw);
        }
        assert_eq!(TypeId::from_raw(999), TypeId::Invalid);
    }

    #[test]
    fn test_type_support() {
        assert!(TypeId::Integer.is_writable());
        assert!(TypeId::TimestampNs.is_writable());
        assert!(TypeId::List.is_readable());
        assert!(!TypeId::List.is_writable());
        assert!(!TypeId::Enum.is_writable());
        assert!(!TypeId::Bit.is_readable());
        assert!(!TypeId::Union.is_readable());
    }

    #[test]
    fn test_logical_type() {
        let ty = LogicalType::new(TypeId::Varchar);
        assert_eq!(ty.id(), TypeId::Varchar);

        let ty = LogicalType::decimal(18, 3);
        assert_eq!(ty.id(), TypeId::Decimal);
        assert_eq!(ty.decimal_width(), 18);
        assert_eq!(ty.decimal_scale(), 3);
        assert_eq!(ty.decimal_internal_type(), TypeId::BigInt);
        assert_eq!(ty.describe(), "DECIMAL(18,3)");
    }

    #[test]
    fn test_check_supported() {
        let uuid = LogicalType::new(TypeId::Uuid);
        assert!(uuid.check_supported(true, 1).is_ok());

        let bit = LogicalType::new(TypeId::Bit);
        let err = bit.check_supported(false, 4).unwrap_err();
        assert!(matches!(
            err,
            DuckDbError::UnsupportedType { index: 4, ref type_name } if type_name == "BIT"
        ));
    }

    #[test]
    fn test_statement_type() {
        assert_eq!(StatementType::from_raw(1), StatementType::Select);
        assert_eq!(StatementType::from_raw(3), StatementType::Update);
        assert_eq!(StatementType::from_raw(27), StatementType::Multi);
        assert_eq!(StatementType::from_raw(100), StatementType::Invalid);
        assert!(StatementType::Select.returns_rows());
        assert!(!StatementType::Insert.returns_rows());
    }
}
