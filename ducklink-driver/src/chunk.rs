//! Fixed-capacity columnar batches.

use std::sync::LazyLock;

use duckdb::ffi;

use crate::codec;
use crate::error::{DuckDbError, DuckDbResult};
use crate::types::LogicalType;
use crate::value::Value;

static CAPACITY: LazyLock<usize> = LazyLock::new(|| unsafe { ffi::duckdb_vector_size() } as usize);

/// Number of rows every data chunk can hold.
///
/// Queried from the engine once per process.
pub fn data_chunk_capacity() -> usize {
    *CAPACITY
}

/// A columnar batch of up to [`data_chunk_capacity`] rows.
///
/// The native chunk is released when the value is dropped.
pub struct DataChunk {
    raw: ffi::duckdb_data_chunk,
    types: Vec<LogicalType>,
    writable: bool,
}

impl DataChunk {
    /// Allocate a chunk with one column per type.
    ///
    /// With `for_write` each type must be writable and every row starts out
    /// NULL until a value is written to it.
    pub fn from_types(types: Vec<LogicalType>, for_write: bool) -> DuckDbResult<Self> {
        for (i, ty) in types.iter().enumerate() {
            ty.check_supported(for_write, i + 1)?;
        }
        let mut raw_types: Vec<ffi::duckdb_logical_type> = types.iter().map(|t| t.raw()).collect();
        let raw = unsafe {
            ffi::duckdb_create_data_chunk(raw_types.as_mut_ptr(), raw_types.len() as ffi::idx_t)
        };
        if raw.is_null() {
            return Err(DuckDbError::internal("could not allocate data chunk"));
        }
        let chunk = Self {
            raw,
            types,
            writable: for_write,
        };
        if for_write {
            let words = data_chunk_capacity().div_ceil(64);
            for col in 0..chunk.types.len() {
                let vector = chunk.vector(col);
                unsafe {
                    ffi::duckdb_vector_ensure_validity_writable(vector);
                    let mask = ffi::duckdb_vector_get_validity(vector);
                    if mask.is_null() {
                        return Err(DuckDbError::internal("could not allocate validity mask"));
                    }
                    std::ptr::write_bytes(mask, 0, words);
                }
            }
        }
        Ok(chunk)
    }

    /// Take ownership of a chunk fetched from a query result.
    pub(crate) fn from_result(raw: ffi::duckdb_data_chunk) -> Self {
        let count = unsafe { ffi::duckdb_data_chunk_get_column_count(raw) } as usize;
        let types = (0..count)
            .map(|col| {
                let vector = unsafe { ffi::duckdb_data_chunk_get_vector(raw, col as ffi::idx_t) };
                LogicalType::from_raw(unsafe { ffi::duckdb_vector_get_column_type(vector) })
            })
            .collect();
        Self {
            raw,
            types,
            writable: false,
        }
    }

    pub(crate) fn raw(&self) -> ffi::duckdb_data_chunk {
        self.raw
    }

    fn vector(&self, col: usize) -> ffi::duckdb_vector {
        unsafe { ffi::duckdb_data_chunk_get_vector(self.raw, col as ffi::idx_t) }
    }

    fn check_column(&self, col: usize) -> DuckDbResult<()> {
        if col >= self.types.len() {
            return Err(DuckDbError::ColumnIndex {
                index: col,
                count: self.types.len(),
            });
        }
        Ok(())
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.types.len()
    }

    /// Column types.
    pub fn types(&self) -> &[LogicalType] {
        &self.types
    }

    /// Logical number of populated rows.
    pub fn size(&self) -> usize {
        unsafe { ffi::duckdb_data_chunk_get_size(self.raw) as usize }
    }

    /// Declare the number of populated rows.
    pub fn set_size(&mut self, size: usize) -> DuckDbResult<()> {
        if size > data_chunk_capacity() {
            return Err(DuckDbError::internal(format!(
                "chunk size {} exceeds capacity {}",
                size,
                data_chunk_capacity()
            )));
        }
        unsafe { ffi::duckdb_data_chunk_set_size(self.raw, size as ffi::idx_t) };
        Ok(())
    }

    /// Encode `value` into column `col` at `row`.
    pub fn set_value(&mut self, col: usize, row: usize, value: &Value) -> DuckDbResult<()> {
        if !self.writable {
            return Err(DuckDbError::internal("data chunk is read-only"));
        }
        self.check_column(col)?;
        if row >= data_chunk_capacity() {
            return Err(DuckDbError::internal(format!(
                "row {} exceeds chunk capacity {}",
                row,
                data_chunk_capacity()
            )));
        }
        unsafe { codec::write_value(self.vector(col), &self.types[col], row, value) }
            .map_err(|e| e.at_index(col + 1))
    }

    /// Decode the value of column `col` at `row`.
    ///
    /// Only rows below [`DataChunk::size`] are readable; call
    /// [`DataChunk::set_size`] after writing.
    pub fn value(&self, col: usize, row: usize) -> DuckDbResult<Value> {
        self.check_column(col)?;
        let size = self.size();
        if row >= size {
            return Err(DuckDbError::internal(format!(
                "row {} out of range for chunk of {} rows",
                row, size
            )));
        }
        unsafe { codec::read_value(self.vector(col), &self.types[col], row) }
            .map_err(|e| e.at_index(col + 1))
    }
}

impl Drop for DataChunk {
    fn drop(&mut self) {
        unsafe { ffi::duckdb_destroy_data_chunk(&mut self.raw) };
    }
}

impl std::fmt::Debug for DataChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChunk")
            .field("types", &self.types)
            .field("size", &self.size())
            .field("writable", &self.writable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Interval, TypeId};
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn single(ty: LogicalType) -> DataChunk {
        DataChunk::from_types(vec![ty], true).unwrap()
    }

    fn roundtrip(ty: LogicalType, values: &[Value]) {
        let described = ty.describe();
        let mut chunk = single(ty);
        for (row, v) in values.iter().enumerate() {
            chunk.set_value(0, row, v).unwrap();
        }
        chunk.set_size(values.len()).unwrap();
        for (row, v) in values.iter().enumerate() {
            assert_eq!(&chunk.value(0, row).unwrap(), v, "{} row {}", described, row);
        }
    }

    #[test]
    fn test_capacity_is_stable() {
        let cap = data_chunk_capacity();
        assert!(cap > 0);
        assert_eq!(cap, data_chunk_capacity());
    }

    #[test]
    fn test_roundtrip_integers() {
        roundtrip(
            LogicalType::new(TypeId::TinyInt),
            &[Value::TinyInt(i8::MIN), Value::TinyInt(i8::MAX), Value::TinyInt(0)],
        );
        roundtrip(
            LogicalType::new(TypeId::SmallInt),
            &[Value::SmallInt(i16::MIN), Value::SmallInt(i16::MAX)],
        );
        roundtrip(
            LogicalType::new(TypeId::Integer),
            &[Value::Integer(i32::MIN), Value::Integer(i32::MAX)],
        );
        roundtrip(
            LogicalType::new(TypeId::BigInt),
            &[Value::BigInt(i64::MIN), Value::BigInt(i64::MAX)],
        );
        roundtrip(
            LogicalType::new(TypeId::HugeInt),
            &[Value::HugeInt(i128::MIN), Value::HugeInt(i128::MAX), Value::HugeInt(-1)],
        );
        roundtrip(LogicalType::new(TypeId::UTinyInt), &[Value::UTinyInt(u8::MAX)]);
        roundtrip(LogicalType::new(TypeId::USmallInt), &[Value::USmallInt(u16::MAX)]);
        roundtrip(LogicalType::new(TypeId::UInteger), &[Value::UInteger(u32::MAX)]);
        roundtrip(LogicalType::new(TypeId::UBigInt), &[Value::UBigInt(u64::MAX)]);
        roundtrip(
            LogicalType::new(TypeId::UHugeInt),
            &[Value::UHugeInt(u128::MAX), Value::UHugeInt(0)],
        );
    }

    #[test]
    fn test_roundtrip_scalars() {
        roundtrip(
            LogicalType::new(TypeId::Boolean),
            &[Value::Boolean(true), Value::Boolean(false)],
        );
        roundtrip(
            LogicalType::new(TypeId::Float),
            &[Value::Float(f32::MIN), Value::Float(1.5)],
        );
        roundtrip(
            LogicalType::new(TypeId::Double),
            &[Value::Double(f64::MAX), Value::Double(-0.25)],
        );
        roundtrip(
            LogicalType::new(TypeId::Varchar),
            &[
                Value::Text(String::new()),
                Value::Text("short".into()),
                Value::Text("a string longer than twelve bytes".into()),
            ],
        );
        roundtrip(
            LogicalType::new(TypeId::Blob),
            &[Value::Blob(vec![0, 1, 2, 255]), Value::Blob(vec![7; 64])],
        );
        roundtrip(
            LogicalType::new(TypeId::Uuid),
            &[Value::Uuid(Uuid::nil()), Value::Uuid(Uuid::from_u128(u128::MAX)), Value::Uuid(Uuid::new_v4())],
        );
        roundtrip(
            LogicalType::new(TypeId::Interval),
            &[Value::Interval(Interval::new(14, -3, 1_500_000))],
        );
        roundtrip(
            LogicalType::decimal(18, 3),
            &[Value::Decimal(Decimal::new(-123_456, 3))],
        );
        roundtrip(
            LogicalType::decimal(4, 1),
            &[Value::Decimal(Decimal::new(999_9, 1))],
        );
        roundtrip(
            LogicalType::decimal(38, 10),
            &[Value::Decimal(Decimal::new(1, 10))],
        );
    }

    #[test]
    fn test_roundtrip_temporal() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let ts = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_micro_opt(8, 15, 30, 250_000)
            .unwrap();

        roundtrip(
            LogicalType::new(TypeId::Date),
            &[Value::Date(epoch), Value::Date(NaiveDate::from_ymd_opt(1, 1, 1).unwrap())],
        );
        roundtrip(
            LogicalType::new(TypeId::Time),
            &[Value::Time(midnight), Value::Time(NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap())],
        );
        roundtrip(LogicalType::new(TypeId::TimeTz), &[Value::TimeTz(midnight)]);
        roundtrip(LogicalType::new(TypeId::Timestamp), &[Value::Timestamp(ts)]);
        roundtrip(LogicalType::new(TypeId::TimestampMs), &[Value::Timestamp(ts)]);
        roundtrip(LogicalType::new(TypeId::TimestampNs), &[Value::Timestamp(ts)]);
        roundtrip(
            LogicalType::new(TypeId::TimestampS),
            &[Value::Timestamp(epoch.and_time(midnight))],
        );
        roundtrip(
            LogicalType::new(TypeId::TimestampTz),
            &[Value::TimestampTz(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap())],
        );
    }

    #[test]
    fn test_null_propagation() {
        for id in [
            TypeId::Boolean,
            TypeId::Integer,
            TypeId::HugeInt,
            TypeId::Double,
            TypeId::Varchar,
            TypeId::Blob,
            TypeId::Date,
            TypeId::TimeTz,
            TypeId::Timestamp,
            TypeId::Interval,
            TypeId::Uuid,
        ] {
            let mut chunk = single(LogicalType::new(id));
            chunk.set_value(0, 0, &Value::Null).unwrap();
            chunk.set_size(1).unwrap();
            assert_eq!(chunk.value(0, 0).unwrap(), Value::Null, "{}", id);
        }
    }

    #[test]
    fn test_write_after_null_restores_validity() {
        let mut chunk = single(LogicalType::new(TypeId::Integer));
        chunk.set_value(0, 0, &Value::Null).unwrap();
        chunk.set_value(0, 0, &Value::Integer(5)).unwrap();
        chunk.set_size(1).unwrap();
        assert_eq!(chunk.value(0, 0).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_narrowing_write() {
        let mut chunk = single(LogicalType::new(TypeId::SmallInt));
        chunk.set_value(0, 0, &Value::BigInt(1234)).unwrap();
        chunk.set_size(1).unwrap();
        assert_eq!(chunk.value(0, 0).unwrap(), Value::SmallInt(1234));

        let err = chunk.set_value(0, 1, &Value::BigInt(1 << 20)).unwrap_err();
        assert!(matches!(err, DuckDbError::AtIndex { index: 1, .. }));
        assert!(err.contains(|e| matches!(e, DuckDbError::Overflow { .. })));

        let err = chunk.set_value(0, 1, &Value::Text("x".into())).unwrap_err();
        assert!(err.contains(|e| matches!(e, DuckDbError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unwritten_rows() {
        let long = Value::Text("x".repeat(200));
        {
            let mut used = single(LogicalType::new(TypeId::Varchar));
            for row in 0..16 {
                used.set_value(0, row, &long).unwrap();
            }
        }

        let mut chunk = single(LogicalType::new(TypeId::Varchar));
        assert_eq!(chunk.size(), 0);
        assert!(chunk.value(0, 5).is_err());

        chunk.set_value(0, 0, &long).unwrap();
        chunk.set_size(6).unwrap();
        assert_eq!(chunk.value(0, 0).unwrap(), long);
        assert_eq!(chunk.value(0, 5).unwrap(), Value::Null);
        assert!(chunk.value(0, 6).is_err());
    }

    #[test]
    fn test_decimal_overflow() {
        let mut chunk = single(LogicalType::decimal(4, 2));
        let err = chunk
            .set_value(0, 0, &Value::Decimal(Decimal::new(100_00, 2)))
            .unwrap_err();
        assert!(err.contains(|e| matches!(e, DuckDbError::Overflow { .. })));
    }

    #[test]
    fn test_unsupported_write_schema() {
        let err = DataChunk::from_types(
            vec![
                LogicalType::new(TypeId::Integer),
                LogicalType::new(TypeId::Bit),
            ],
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DuckDbError::UnsupportedType { index: 2, ref type_name } if type_name == "BIT"
        ));
    }

    #[test]
    fn test_bounds() {
        let mut chunk = single(LogicalType::new(TypeId::Integer));
        assert!(chunk.set_value(1, 0, &Value::Integer(1)).is_err());
        assert!(chunk
            .set_value(0, data_chunk_capacity(), &Value::Integer(1))
            .is_err());
        assert!(chunk.set_size(data_chunk_capacity() + 1).is_err());
        chunk.set_size(data_chunk_capacity()).unwrap();
        assert_eq!(chunk.size(), data_chunk_capacity());
    }
}
