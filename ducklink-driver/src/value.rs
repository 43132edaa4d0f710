//! Driver-side values and statement arguments.
//!
//! [`Value`] is the closed set of values the driver can move across the
//! native boundary. Unsupported inputs are rejected by matching on its
//! variants, so there is no catch-all runtime type check.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{DuckDbError, DuckDbResult};
use crate::types::{Interval, TypeId};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// BOOLEAN
    Boolean(bool),
    /// TINYINT
    TinyInt(i8),
    /// SMALLINT
    SmallInt(i16),
    /// INTEGER
    Integer(i32),
    /// BIGINT
    BigInt(i64),
    /// HUGEINT
    HugeInt(i128),
    /// UTINYINT
    UTinyInt(u8),
    /// USMALLINT
    USmallInt(u16),
    /// UINTEGER
    UInteger(u32),
    /// UBIGINT
    UBigInt(u64),
    /// UHUGEINT
    UHugeInt(u128),
    /// FLOAT
    Float(f32),
    /// DOUBLE
    Double(f64),
    /// DECIMAL
    Decimal(Decimal),
    /// VARCHAR
    Text(String),
    /// BLOB
    Blob(Vec<u8>),
    /// DATE
    Date(NaiveDate),
    /// TIME
    Time(NaiveTime),
    /// TIME WITH TIME ZONE, normalized to UTC.
    TimeTz(NaiveTime),
    /// TIMESTAMP (any precision)
    Timestamp(NaiveDateTime),
    /// TIMESTAMP WITH TIME ZONE
    TimestampTz(DateTime<Utc>),
    /// INTERVAL
    Interval(Interval),
    /// UUID
    Uuid(Uuid),
    /// ENUM member.
    Enum(String),
    /// LIST
    List(Vec<Value>),
    /// ARRAY
    Array(Vec<Value>),
    /// STRUCT, fields in declaration order.
    Struct(Vec<(String, Value)>),
    /// MAP, entries in storage order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The engine type this value naturally maps to.
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Null => TypeId::SqlNull,
            Self::Boolean(_) => TypeId::Boolean,
            Self::TinyInt(_) => TypeId::TinyInt,
            Self::SmallInt(_) => TypeId::SmallInt,
            Self::Integer(_) => TypeId::Integer,
            Self::BigInt(_) => TypeId::BigInt,
            Self::HugeInt(_) => TypeId::HugeInt,
            Self::UTinyInt(_) => TypeId::UTinyInt,
            Self::USmallInt(_) => TypeId::USmallInt,
            Self::UInteger(_) => TypeId::UInteger,
            Self::UBigInt(_) => TypeId::UBigInt,
            Self::UHugeInt(_) => TypeId::UHugeInt,
            Self::Float(_) => TypeId::Float,
            Self::Double(_) => TypeId::Double,
            Self::Decimal(_) => TypeId::Decimal,
            Self::Text(_) => TypeId::Varchar,
            Self::Blob(_) => TypeId::Blob,
            Self::Date(_) => TypeId::Date,
            Self::Time(_) => TypeId::Time,
            Self::TimeTz(_) => TypeId::TimeTz,
            Self::Timestamp(_) => TypeId::Timestamp,
            Self::TimestampTz(_) => TypeId::TimestampTz,
            Self::Interval(_) => TypeId::Interval,
            Self::Uuid(_) => TypeId::Uuid,
            Self::Enum(_) => TypeId::Enum,
            Self::List(_) => TypeId::List,
            Self::Array(_) => TypeId::Array,
            Self::Struct(_) => TypeId::Struct,
            Self::Map(_) => TypeId::Map,
        }
    }

    /// Integer payload widened to `i128`, if this is an integer value.
    pub(crate) fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            Self::TinyInt(v) => v.into(),
            Self::SmallInt(v) => v.into(),
            Self::Integer(v) => v.into(),
            Self::BigInt(v) => v.into(),
            Self::HugeInt(v) => v,
            Self::UTinyInt(v) => v.into(),
            Self::USmallInt(v) => v.into(),
            Self::UInteger(v) => v.into(),
            Self::UBigInt(v) => v.into(),
            Self::UHugeInt(v) => return i128::try_from(v).ok(),
            _ => return None,
        })
    }

    /// Convert to JSON.
    ///
    /// 128-bit integers and decimals become strings to keep their precision,
    /// blobs become lowercase hex.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::TinyInt(i) => JsonValue::Number((*i).into()),
            Self::SmallInt(i) => JsonValue::Number((*i).into()),
            Self::Integer(i) => JsonValue::Number((*i).into()),
            Self::BigInt(i) => JsonValue::Number((*i).into()),
            Self::UTinyInt(i) => JsonValue::Number((*i).into()),
            Self::USmallInt(i) => JsonValue::Number((*i).into()),
            Self::UInteger(i) => JsonValue::Number((*i).into()),
            Self::UBigInt(i) => JsonValue::Number((*i).into()),
            Self::HugeInt(i) => JsonValue::String(i.to_string()),
            Self::UHugeInt(i) => JsonValue::String(i.to_string()),
            Self::Float(f) => serde_json::Number::from_f64(*f as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Decimal(d) => JsonValue::String(d.to_string()),
            Self::Text(s) | Self::Enum(s) => JsonValue::String(s.clone()),
            Self::Blob(bytes) => {
                JsonValue::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
            }
            Self::Date(d) => JsonValue::String(d.to_string()),
            Self::Time(t) | Self::TimeTz(t) => JsonValue::String(t.to_string()),
            Self::Timestamp(ts) => JsonValue::String(ts.to_string()),
            Self::TimestampTz(ts) => JsonValue::String(ts.to_rfc3339()),
            Self::Interval(i) => serde_json::to_value(i).unwrap_or(JsonValue::Null),
            Self::Uuid(u) => JsonValue::String(u.to_string()),
            Self::List(items) | Self::Array(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Struct(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Self::Text(s) | Self::Enum(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key, v.to_json())
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) | Self::Enum(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    i128 => HugeInt,
    u8 => UTinyInt,
    u16 => USmallInt,
    u32 => UInteger,
    u64 => UBigInt,
    u128 => UHugeInt,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Blob,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Interval => Interval,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Typed extraction from a [`Value`].
///
/// Integer conversions are checked, so reading an `i64` cell as `i8` fails
/// with `Overflow` instead of truncating.
pub trait FromValue: Sized {
    /// Convert from a value.
    fn from_value(value: Value) -> DuckDbResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

fn mismatch<T>(expected: &str, value: &Value) -> DuckDbResult<T> {
    Err(DuckDbError::mismatch(expected, value.type_id().name()))
}

macro_rules! impl_from_value_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> DuckDbResult<Self> {
                    let wide = match &value {
                        Value::UHugeInt(v) => {
                            return <$ty>::try_from(*v)
                                .map_err(|_| DuckDbError::overflow(v, stringify!($ty)));
                        }
                        v => match v.as_i128() {
                            Some(wide) => wide,
                            None => return mismatch(stringify!($ty), &value),
                        },
                    };
                    <$ty>::try_from(wide).map_err(|_| DuckDbError::overflow(wide, stringify!($ty)))
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, isize, usize);

impl FromValue for bool {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            v => mismatch("bool", &v),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Double(f) => Ok(f),
            Value::Float(f) => Ok(f.into()),
            v => match v.as_i128() {
                Some(i) => {
                    let f = i as f64;
                    // i128::MAX rounds up to 2^127, which saturates back on the cast.
                    if f as i128 != i || f >= 2f64.powi(127) {
                        return Err(DuckDbError::overflow(i, "f64"));
                    }
                    Ok(f)
                }
                None => mismatch("f64", &v),
            },
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            v => mismatch("f32", &v),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Text(s) | Value::Enum(s) => Ok(s),
            v => mismatch("String", &v),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            v => mismatch("Vec<u8>", &v),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            v => match v.as_i128() {
                Some(i) => Decimal::try_from_i128_with_scale(i, 0)
                    .map_err(|_| DuckDbError::overflow(i, "Decimal")),
                None => mismatch("Decimal", &v),
            },
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Timestamp(ts) => Ok(ts.date()),
            v => mismatch("NaiveDate", &v),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Time(t) | Value::TimeTz(t) => Ok(t),
            v => mismatch("NaiveTime", &v),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::TimestampTz(ts) => Ok(ts.naive_utc()),
            v => mismatch("NaiveDateTime", &v),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::TimestampTz(ts) => Ok(ts),
            Value::Timestamp(ts) => Ok(ts.and_utc()),
            v => mismatch("DateTime<Utc>", &v),
        }
    }
}

impl FromValue for Interval {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Interval(i) => Ok(i),
            v => mismatch("Interval", &v),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(ref s) => {
                Uuid::parse_str(s).map_err(|_| DuckDbError::mismatch("Uuid", "VARCHAR"))
            }
            v => mismatch("Uuid", &v),
        }
    }
}

impl FromValue for JsonValue {
    fn from_value(value: Value) -> DuckDbResult<Self> {
        Ok(value.to_json())
    }
}

/// A statement argument with optional ordinal and name overrides.
///
/// Arguments resolve against parameters by position first; an argument whose
/// `ordinal` equals the parameter's 1-based index overrides that, and an
/// argument whose `name` equals the parameter's name overrides both.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    /// Parameter name to bind to (`$name`).
    pub name: Option<String>,
    /// 1-based parameter index to bind to.
    pub ordinal: Option<usize>,
    /// The value.
    pub value: Value,
}

impl NamedValue {
    /// A purely positional argument.
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal: None,
            value: value.into(),
        }
    }

    /// An argument for the 1-based parameter `ordinal`.
    pub fn ordinal(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal: Some(ordinal),
            value: value.into(),
        }
    }

    /// An argument for the parameter called `name`.
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal: None,
            value: value.into(),
        }
    }
}

/// Number positional values `1..=n`.
pub fn positional<I>(values: I) -> Vec<NamedValue>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| NamedValue::ordinal(i + 1, v))
        .collect()
}

/// Build a positional argument list.
///
/// ```rust,ignore
/// let args = params![1, "x", None::<i32>];
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::value::NamedValue>::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut ordinal = 0usize;
        ::std::vec![$({
            ordinal += 1;
            $crate::value::NamedValue::ordinal(ordinal, $value)
        }),+]
    }};
}
