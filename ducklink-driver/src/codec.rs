//! Conversion between [`Value`] and the engine's vector and parameter formats.
//!
//! Vector reads and writes address one cell of a native vector given its
//! logical type; parameter binding addresses one slot of a prepared
//! statement. Neither path panics on bad input data.

use std::ffi::{c_char, c_void};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use duckdb::ffi;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DuckDbError, DuckDbResult};
use crate::handle::{PreparedHandle, ValueHandle, succeeded, take_text};
use crate::types::{Interval, LogicalType, TypeId};
use crate::value::Value;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;
/// Largest TIME_TZ offset in seconds (15:59:59).
const MAX_TZ_OFFSET: i64 = 16 * 60 * 60 - 1;
const STRING_INLINE_LENGTH: u32 = 12;
const STRING_T_SIZE: usize = 16;
const UUID_SIGN_FLIP: u64 = 1 << 63;

// =============================================================================
// Scalar conversions
// =============================================================================

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn days_to_date(days: i32) -> DuckDbResult<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| DuckDbError::overflow(days, "DATE"))
}

pub(crate) fn time_to_micros(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * MICROS_PER_SECOND
        + (time.nanosecond() as i64 / 1_000)
}

pub(crate) fn micros_to_time(micros: i64) -> DuckDbResult<NaiveTime> {
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return Err(DuckDbError::overflow(micros, "TIME"));
    }
    let secs = (micros / MICROS_PER_SECOND) as u32;
    let nanos = (micros % MICROS_PER_SECOND) as u32 * 1_000;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| DuckDbError::overflow(micros, "TIME"))
}

/// Pack a time of day into TIME_TZ bits with a zero UTC offset.
pub(crate) fn time_tz_bits(time: NaiveTime) -> u64 {
    ((time_to_micros(time) as u64) << 24) | MAX_TZ_OFFSET as u64
}

/// Unpack TIME_TZ bits into the equivalent UTC time of day.
pub(crate) fn time_tz_from_bits(bits: u64) -> DuckDbResult<NaiveTime> {
    let micros = (bits >> 24) as i64;
    let offset_secs = MAX_TZ_OFFSET - (bits & 0x00FF_FFFF) as i64;
    let utc = (micros - offset_secs * MICROS_PER_SECOND).rem_euclid(MICROS_PER_DAY);
    micros_to_time(utc)
}

/// Epoch ticks of a timestamp at the precision of `id`.
pub(crate) fn timestamp_to_ticks(ts: NaiveDateTime, id: TypeId) -> DuckDbResult<i64> {
    let utc = ts.and_utc();
    match id {
        TypeId::TimestampS => Ok(utc.timestamp()),
        TypeId::TimestampMs => Ok(utc.timestamp_millis()),
        TypeId::TimestampNs => utc
            .timestamp_nanos_opt()
            .ok_or_else(|| DuckDbError::overflow(ts, id.name())),
        _ => Ok(utc.timestamp_micros()),
    }
}

pub(crate) fn ticks_to_timestamp(ticks: i64, id: TypeId) -> DuckDbResult<NaiveDateTime> {
    let dt = match id {
        TypeId::TimestampS => DateTime::from_timestamp(ticks, 0),
        TypeId::TimestampMs => DateTime::from_timestamp_millis(ticks),
        TypeId::TimestampNs => Some(DateTime::from_timestamp_nanos(ticks)),
        _ => DateTime::from_timestamp_micros(ticks),
    };
    dt.map(|d| d.naive_utc())
        .ok_or_else(|| DuckDbError::overflow(ticks, id.name()))
}

pub(crate) fn split_hugeint(v: i128) -> ffi::duckdb_hugeint {
    ffi::duckdb_hugeint {
        lower: v as u64,
        upper: (v >> 64) as i64,
    }
}

pub(crate) fn join_hugeint(h: ffi::duckdb_hugeint) -> i128 {
    ((h.upper as i128) << 64) | h.lower as i128
}

pub(crate) fn uuid_to_hugeint(uuid: Uuid) -> ffi::duckdb_hugeint {
    let bits = uuid.as_u128();
    ffi::duckdb_hugeint {
        lower: bits as u64,
        upper: (((bits >> 64) as u64) ^ UUID_SIGN_FLIP) as i64,
    }
}

pub(crate) fn hugeint_to_uuid(h: ffi::duckdb_hugeint) -> Uuid {
    let upper = (h.upper as u64) ^ UUID_SIGN_FLIP;
    Uuid::from_u128(((upper as u128) << 64) | h.lower as u128)
}

/// Unscaled mantissa of `value` at `scale`, checked against `width` digits.
pub(crate) fn decimal_mantissa(value: Decimal, width: u8, scale: u8) -> DuckDbResult<i128> {
    let target = format!("DECIMAL({},{})", width, scale);
    if scale as u32 > Decimal::MAX_SCALE {
        return Err(DuckDbError::overflow(value, target));
    }
    if value.normalize().scale() > scale as u32 {
        return Err(DuckDbError::overflow(value, target));
    }
    let mut scaled = value;
    scaled.rescale(scale as u32);
    if scaled.scale() != scale as u32 {
        return Err(DuckDbError::overflow(value, target));
    }
    let mantissa = scaled.mantissa();
    let limit = 10i128
        .checked_pow(width as u32)
        .ok_or_else(|| DuckDbError::overflow(value, target.clone()))?;
    if mantissa.abs() >= limit {
        return Err(DuckDbError::overflow(value, target));
    }
    Ok(mantissa)
}

pub(crate) fn decimal_from_mantissa(mantissa: i128, scale: u8) -> DuckDbResult<Decimal> {
    Decimal::try_from_i128_with_scale(mantissa, scale as u32)
        .map_err(|_| DuckDbError::overflow(mantissa, format!("Decimal(scale {})", scale)))
}

fn integer<T: TryFrom<i128>>(value: &Value, target: TypeId) -> DuckDbResult<T> {
    match value.as_i128() {
        Some(wide) => T::try_from(wide).map_err(|_| DuckDbError::overflow(wide, target.name())),
        None => match value {
            Value::UHugeInt(v) => Err(DuckDbError::overflow(v, target.name())),
            other => Err(DuckDbError::mismatch(target.name(), other.type_id().name())),
        },
    }
}

// =============================================================================
// Vector reads
// =============================================================================

unsafe fn cell<T: Copy>(vector: ffi::duckdb_vector, row: usize) -> T {
    let data = unsafe { ffi::duckdb_vector_get_data(vector) } as *const T;
    unsafe { data.add(row).read() }
}

unsafe fn cell_mut<T>(vector: ffi::duckdb_vector, row: usize) -> *mut T {
    let data = unsafe { ffi::duckdb_vector_get_data(vector) } as *mut T;
    unsafe { data.add(row) }
}

unsafe fn is_valid(vector: ffi::duckdb_vector, row: usize) -> bool {
    let validity = unsafe { ffi::duckdb_vector_get_validity(vector) };
    validity.is_null() || unsafe { ffi::duckdb_validity_row_is_valid(validity, row as ffi::idx_t) }
}

/// Bytes of a `duckdb_string_t` cell: inlined when short, else by pointer.
unsafe fn string_bytes(vector: ffi::duckdb_vector, row: usize) -> Vec<u8> {
    let data = unsafe { ffi::duckdb_vector_get_data(vector) } as *const u8;
    let base = unsafe { data.add(row * STRING_T_SIZE) };
    let len = unsafe { (base as *const u32).read_unaligned() };
    let ptr = if len <= STRING_INLINE_LENGTH {
        unsafe { base.add(4) }
    } else {
        unsafe { (base.add(8) as *const *const u8).read_unaligned() }
    };
    unsafe { std::slice::from_raw_parts(ptr, len as usize) }.to_vec()
}

fn vector_type(vector: ffi::duckdb_vector) -> LogicalType {
    LogicalType::from_raw(unsafe { ffi::duckdb_vector_get_column_type(vector) })
}

/// Decode the cell at `row` of a vector of type `ty`.
///
/// # Safety
///
/// `vector` must be a live vector of type `ty` with more than `row` rows.
pub(crate) unsafe fn read_value(
    vector: ffi::duckdb_vector,
    ty: &LogicalType,
    row: usize,
) -> DuckDbResult<Value> {
    if !unsafe { is_valid(vector, row) } {
        return Ok(Value::Null);
    }
    let id = ty.id();
    let value = unsafe {
        match id {
            TypeId::Boolean => Value::Boolean(cell::<u8>(vector, row) != 0),
            TypeId::TinyInt => Value::TinyInt(cell(vector, row)),
            TypeId::SmallInt => Value::SmallInt(cell(vector, row)),
            TypeId::Integer => Value::Integer(cell(vector, row)),
            TypeId::BigInt => Value::BigInt(cell(vector, row)),
            TypeId::UTinyInt => Value::UTinyInt(cell(vector, row)),
            TypeId::USmallInt => Value::USmallInt(cell(vector, row)),
            TypeId::UInteger => Value::UInteger(cell(vector, row)),
            TypeId::UBigInt => Value::UBigInt(cell(vector, row)),
            TypeId::Float => Value::Float(cell(vector, row)),
            TypeId::Double => Value::Double(cell(vector, row)),
            TypeId::HugeInt => Value::HugeInt(join_hugeint(cell(vector, row))),
            TypeId::UHugeInt => {
                let h: ffi::duckdb_uhugeint = cell(vector, row);
                Value::UHugeInt(((h.upper as u128) << 64) | h.lower as u128)
            }
            TypeId::Varchar => {
                let bytes = string_bytes(vector, row);
                Value::Text(String::from_utf8(bytes).map_err(|e| {
                    DuckDbError::deserialization(format!("invalid UTF-8 in VARCHAR: {}", e))
                })?)
            }
            TypeId::Blob => Value::Blob(string_bytes(vector, row)),
            TypeId::Date => Value::Date(days_to_date(cell::<i32>(vector, row))?),
            TypeId::Time => Value::Time(micros_to_time(cell::<i64>(vector, row))?),
            TypeId::TimeTz => Value::TimeTz(time_tz_from_bits(cell::<u64>(vector, row))?),
            TypeId::Timestamp
            | TypeId::TimestampS
            | TypeId::TimestampMs
            | TypeId::TimestampNs => Value::Timestamp(ticks_to_timestamp(cell(vector, row), id)?),
            TypeId::TimestampTz => {
                let micros: i64 = cell(vector, row);
                Value::TimestampTz(
                    DateTime::<Utc>::from_timestamp_micros(micros)
                        .ok_or_else(|| DuckDbError::overflow(micros, id.name()))?,
                )
            }
            TypeId::Interval => {
                let i: ffi::duckdb_interval = cell(vector, row);
                Value::Interval(Interval::new(i.months, i.days, i.micros))
            }
            TypeId::Uuid => Value::Uuid(hugeint_to_uuid(cell(vector, row))),
            TypeId::Decimal => {
                let mantissa = match ty.decimal_internal_type() {
                    TypeId::SmallInt => cell::<i16>(vector, row) as i128,
                    TypeId::Integer => cell::<i32>(vector, row) as i128,
                    TypeId::BigInt => cell::<i64>(vector, row) as i128,
                    _ => join_hugeint(cell(vector, row)),
                };
                Value::Decimal(decimal_from_mantissa(mantissa, ty.decimal_scale())?)
            }
            TypeId::Enum => {
                let index: u64 = match ty.enum_internal_type() {
                    TypeId::UTinyInt => cell::<u8>(vector, row).into(),
                    TypeId::USmallInt => cell::<u16>(vector, row).into(),
                    _ => cell::<u32>(vector, row).into(),
                };
                let text = take_text(ffi::duckdb_enum_dictionary_value(ty.raw(), index as _));
                Value::Enum(text.unwrap_or_default())
            }
            TypeId::List => Value::List(read_list(vector, row)?),
            TypeId::Map => {
                let entries = read_list(vector, row)?
                    .into_iter()
                    .map(|entry| match entry {
                        Value::Struct(mut fields) if fields.len() == 2 => {
                            let (_, value) = fields.remove(1);
                            let (_, key) = fields.remove(0);
                            Ok((key, value))
                        }
                        other => Err(DuckDbError::mismatch("MAP entry", other.type_id().name())),
                    })
                    .collect::<DuckDbResult<_>>()?;
                Value::Map(entries)
            }
            TypeId::Array => {
                let size = ty.array_size();
                let child = ffi::duckdb_array_vector_get_child(vector);
                let child_ty = vector_type(child);
                let items = (row * size..(row + 1) * size)
                    .map(|i| read_value(child, &child_ty, i))
                    .collect::<DuckDbResult<_>>()?;
                Value::Array(items)
            }
            TypeId::Struct => {
                let fields = ty
                    .struct_field_names()
                    .into_iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let child = ffi::duckdb_struct_vector_get_child(vector, i as ffi::idx_t);
                        let child_ty = vector_type(child);
                        Ok((name, read_value(child, &child_ty, row)?))
                    })
                    .collect::<DuckDbResult<_>>()?;
                Value::Struct(fields)
            }
            other => return Err(DuckDbError::unsupported(other.name(), 0)),
        }
    };
    Ok(value)
}

unsafe fn read_list(vector: ffi::duckdb_vector, row: usize) -> DuckDbResult<Vec<Value>> {
    let entry: ffi::duckdb_list_entry = unsafe { cell(vector, row) };
    let child = unsafe { ffi::duckdb_list_vector_get_child(vector) };
    let child_ty = vector_type(child);
    let start = entry.offset as usize;
    (start..start + entry.length as usize)
        .map(|i| unsafe { read_value(child, &child_ty, i) })
        .collect()
}

// =============================================================================
// Vector writes
// =============================================================================

/// Mark `row` as NULL or valid.
///
/// # Safety
///
/// `vector` must be a live, writable vector with more than `row` rows.
pub(crate) unsafe fn set_validity(vector: ffi::duckdb_vector, row: usize, valid: bool) {
    unsafe {
        if !valid {
            ffi::duckdb_vector_ensure_validity_writable(vector);
        }
        let validity = ffi::duckdb_vector_get_validity(vector);
        if !validity.is_null() {
            ffi::duckdb_validity_set_row_validity(validity, row as ffi::idx_t, valid);
        }
    }
}

unsafe fn put<T>(vector: ffi::duckdb_vector, row: usize, v: T) {
    unsafe { cell_mut::<T>(vector, row).write(v) };
}

unsafe fn put_bytes(vector: ffi::duckdb_vector, row: usize, bytes: &[u8]) {
    unsafe {
        ffi::duckdb_vector_assign_string_element_len(
            vector,
            row as ffi::idx_t,
            bytes.as_ptr() as *const c_char,
            bytes.len() as ffi::idx_t,
        )
    };
}

/// Encode `value` into the cell at `row` of a vector of type `ty`.
///
/// # Safety
///
/// `vector` must be a live, writable vector of type `ty` with more than `row`
/// rows.
pub(crate) unsafe fn write_value(
    vector: ffi::duckdb_vector,
    ty: &LogicalType,
    row: usize,
    value: &Value,
) -> DuckDbResult<()> {
    if value.is_null() {
        unsafe { set_validity(vector, row, false) };
        return Ok(());
    }
    let id = ty.id();
    let mismatch = || DuckDbError::mismatch(id.name(), value.type_id().name());
    unsafe {
        match id {
            TypeId::Boolean => match value {
                Value::Boolean(b) => put(vector, row, u8::from(*b)),
                _ => return Err(mismatch()),
            },
            TypeId::TinyInt => put(vector, row, integer::<i8>(value, id)?),
            TypeId::SmallInt => put(vector, row, integer::<i16>(value, id)?),
            TypeId::Integer => put(vector, row, integer::<i32>(value, id)?),
            TypeId::BigInt => put(vector, row, integer::<i64>(value, id)?),
            TypeId::UTinyInt => put(vector, row, integer::<u8>(value, id)?),
            TypeId::USmallInt => put(vector, row, integer::<u16>(value, id)?),
            TypeId::UInteger => put(vector, row, integer::<u32>(value, id)?),
            TypeId::UBigInt => put(vector, row, integer::<u64>(value, id)?),
            TypeId::HugeInt => put(vector, row, split_hugeint(integer::<i128>(value, id)?)),
            TypeId::UHugeInt => {
                let v = match value {
                    Value::UHugeInt(v) => *v,
                    other => integer::<u128>(other, id)?,
                };
                put(
                    vector,
                    row,
                    ffi::duckdb_uhugeint {
                        lower: v as u64,
                        upper: (v >> 64) as u64,
                    },
                );
            }
            TypeId::Float => match value {
                Value::Float(f) => put(vector, row, *f),
                _ => return Err(mismatch()),
            },
            TypeId::Double => match value {
                Value::Double(f) => put(vector, row, *f),
                Value::Float(f) => put(vector, row, f64::from(*f)),
                _ => return Err(mismatch()),
            },
            TypeId::Varchar => match value {
                Value::Text(s) | Value::Enum(s) => put_bytes(vector, row, s.as_bytes()),
                Value::Uuid(u) => put_bytes(vector, row, u.to_string().as_bytes()),
                _ => return Err(mismatch()),
            },
            TypeId::Blob => match value {
                Value::Blob(b) => put_bytes(vector, row, b),
                Value::Text(s) => put_bytes(vector, row, s.as_bytes()),
                _ => return Err(mismatch()),
            },
            TypeId::Date => match value {
                Value::Date(d) => put(vector, row, date_to_days(*d)),
                _ => return Err(mismatch()),
            },
            TypeId::Time => match value {
                Value::Time(t) | Value::TimeTz(t) => put(vector, row, time_to_micros(*t)),
                _ => return Err(mismatch()),
            },
            TypeId::TimeTz => match value {
                Value::Time(t) | Value::TimeTz(t) => put(vector, row, time_tz_bits(*t)),
                _ => return Err(mismatch()),
            },
            TypeId::Timestamp
            | TypeId::TimestampS
            | TypeId::TimestampMs
            | TypeId::TimestampNs
            | TypeId::TimestampTz => {
                let ts = match value {
                    Value::Timestamp(ts) => *ts,
                    Value::TimestampTz(ts) => ts.naive_utc(),
                    _ => return Err(mismatch()),
                };
                put(vector, row, timestamp_to_ticks(ts, id)?);
            }
            TypeId::Interval => match value {
                Value::Interval(i) => put(
                    vector,
                    row,
                    ffi::duckdb_interval {
                        months: i.months,
                        days: i.days,
                        micros: i.micros,
                    },
                ),
                _ => return Err(mismatch()),
            },
            TypeId::Uuid => {
                let uuid = match value {
                    Value::Uuid(u) => *u,
                    Value::Text(s) => Uuid::parse_str(s).map_err(|_| mismatch())?,
                    _ => return Err(mismatch()),
                };
                put(vector, row, uuid_to_hugeint(uuid));
            }
            TypeId::Decimal => {
                let decimal = match value {
                    Value::Decimal(d) => *d,
                    other => Decimal::from_i128_with_scale(integer::<i64>(other, id)?.into(), 0),
                };
                let width = ty.decimal_width();
                let mantissa = decimal_mantissa(decimal, width, ty.decimal_scale())?;
                let target = ty.describe();
                let narrow = |m: i128| DuckDbError::overflow(m, target.clone());
                match ty.decimal_internal_type() {
                    TypeId::SmallInt => {
                        put(vector, row, i16::try_from(mantissa).map_err(|_| narrow(mantissa))?)
                    }
                    TypeId::Integer => {
                        put(vector, row, i32::try_from(mantissa).map_err(|_| narrow(mantissa))?)
                    }
                    TypeId::BigInt => {
                        put(vector, row, i64::try_from(mantissa).map_err(|_| narrow(mantissa))?)
                    }
                    _ => put(vector, row, split_hugeint(mantissa)),
                }
            }
            other => return Err(DuckDbError::unsupported(other.name(), 0)),
        }
        set_validity(vector, row, true);
    }
    Ok(())
}

// =============================================================================
// Parameter binding
// =============================================================================

/// Bind `value` to the 1-based parameter `index`.
///
/// Dispatch is on the value's variant. Primitives bind to any parameter;
/// temporal and complex values additionally consult the parameter's declared
/// type.
pub(crate) fn bind_value(
    prepared: &PreparedHandle,
    index: usize,
    value: &Value,
) -> DuckDbResult<()> {
    let param_type = prepared.param_type(index);
    let needs_param_type = matches!(
        value,
        Value::Date(_)
            | Value::Time(_)
            | Value::TimeTz(_)
            | Value::Timestamp(_)
            | Value::TimestampTz(_)
            | Value::Decimal(_)
            | Value::Enum(_)
            | Value::List(_)
            | Value::Array(_)
            | Value::Struct(_)
            | Value::Map(_)
    );
    if needs_param_type && !bindable_param(param_type) {
        return Err(DuckDbError::unsupported(param_type.name(), index));
    }

    let stmt = prepared.raw();
    let idx = index as ffi::idx_t;
    let state = unsafe {
        match value {
            Value::Null => ffi::duckdb_bind_null(stmt, idx),
            Value::Boolean(b) => ffi::duckdb_bind_boolean(stmt, idx, *b),
            Value::TinyInt(v) => ffi::duckdb_bind_int8(stmt, idx, *v),
            Value::SmallInt(v) => ffi::duckdb_bind_int16(stmt, idx, *v),
            Value::Integer(v) => ffi::duckdb_bind_int32(stmt, idx, *v),
            Value::BigInt(v) => ffi::duckdb_bind_int64(stmt, idx, *v),
            Value::UTinyInt(v) => ffi::duckdb_bind_uint8(stmt, idx, *v),
            Value::USmallInt(v) => ffi::duckdb_bind_uint16(stmt, idx, *v),
            Value::UInteger(v) => ffi::duckdb_bind_uint32(stmt, idx, *v),
            Value::UBigInt(v) => ffi::duckdb_bind_uint64(stmt, idx, *v),
            Value::HugeInt(v) => ffi::duckdb_bind_hugeint(stmt, idx, split_hugeint(*v)),
            Value::UHugeInt(v) => {
                let signed =
                    i128::try_from(*v).map_err(|_| DuckDbError::overflow(v, "HUGEINT"))?;
                ffi::duckdb_bind_hugeint(stmt, idx, split_hugeint(signed))
            }
            Value::Float(v) => ffi::duckdb_bind_float(stmt, idx, *v),
            Value::Double(v) => ffi::duckdb_bind_double(stmt, idx, *v),
            Value::Text(s) => ffi::duckdb_bind_varchar_length(
                stmt,
                idx,
                s.as_ptr() as *const c_char,
                s.len() as ffi::idx_t,
            ),
            Value::Uuid(u) => {
                let text = u.to_string();
                ffi::duckdb_bind_varchar_length(
                    stmt,
                    idx,
                    text.as_ptr() as *const c_char,
                    text.len() as ffi::idx_t,
                )
            }
            Value::Blob(b) => ffi::duckdb_bind_blob(
                stmt,
                idx,
                b.as_ptr() as *const c_void,
                b.len() as ffi::idx_t,
            ),
            Value::Interval(i) => ffi::duckdb_bind_interval(
                stmt,
                idx,
                ffi::duckdb_interval {
                    months: i.months,
                    days: i.days,
                    micros: i.micros,
                },
            ),
            Value::Date(d) => ffi::duckdb_bind_date(
                stmt,
                idx,
                ffi::duckdb_date {
                    days: date_to_days(*d),
                },
            ),
            Value::Time(t) if param_type != TypeId::TimeTz => ffi::duckdb_bind_time(
                stmt,
                idx,
                ffi::duckdb_time {
                    micros: time_to_micros(*t),
                },
            ),
            Value::Time(t) | Value::TimeTz(t) => {
                let tz = ValueHandle::time_tz(time_to_micros(*t));
                ffi::duckdb_bind_value(stmt, idx, tz.raw())
            }
            Value::Timestamp(ts) => ffi::duckdb_bind_timestamp(
                stmt,
                idx,
                ffi::duckdb_timestamp {
                    micros: ts.and_utc().timestamp_micros(),
                },
            ),
            Value::TimestampTz(ts) => ffi::duckdb_bind_timestamp(
                stmt,
                idx,
                ffi::duckdb_timestamp {
                    micros: ts.timestamp_micros(),
                },
            ),
            Value::Decimal(_)
            | Value::Enum(_)
            | Value::List(_)
            | Value::Array(_)
            | Value::Struct(_)
            | Value::Map(_) => {
                return Err(DuckDbError::unsupported(value.type_id().name(), index));
            }
        }
    };
    if succeeded(state) {
        Ok(())
    } else {
        Err(DuckDbError::Engine(prepared.error().unwrap_or_else(|| {
            format!("could not bind {} to parameter {}", value.type_id(), index)
        })))
    }
}

/// Parameter types a temporal or complex value may be bound to.
fn bindable_param(param_type: TypeId) -> bool {
    !param_type.is_nested()
        && !matches!(
            param_type,
            TypeId::Enum | TypeId::TimestampS | TypeId::TimestampMs | TypeId::TimestampNs
        )
}
