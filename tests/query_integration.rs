//! Integration tests for querying through the public API.
//!
//! These tests cover:
//! - Value decoding for scalar, temporal and nested columns
//! - Parameter binding
//! - Cancellation
//! - The async pool

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use ducklink::driver::{FromRow, Interval, TypeId};
use ducklink::prelude::*;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

fn token() -> CancellationToken {
    CancellationToken::new()
}

fn single_row(conn: &Connection, sql: &str, args: &[NamedValue]) -> Row {
    conn.query(&token(), sql, args)
        .expect("query failed")
        .next()
        .expect("no rows")
        .expect("row failed")
}

/// Test decoding of every scalar type from one row
#[test]
fn test_scalar_types_decode() {
    let conn = Connection::open_in_memory().unwrap();
    let row = single_row(
        &conn,
        "SELECT
            true,
            -8::TINYINT,
            -16::SMALLINT,
            -32::INTEGER,
            -64::BIGINT,
            '170141183460469231731687303715884105727'::HUGEINT,
            255::UTINYINT,
            65535::USMALLINT,
            4294967295::UINTEGER,
            '18446744073709551615'::UBIGINT,
            1.5::FLOAT,
            2.25::DOUBLE,
            'hello',
            'a much longer string that is not inlined',
            '\\xAA\\xBB'::BLOB",
        &[],
    );

    assert_eq!(
        row.values(),
        &[
            Value::Boolean(true),
            Value::TinyInt(-8),
            Value::SmallInt(-16),
            Value::Integer(-32),
            Value::BigInt(-64),
            Value::HugeInt(i128::MAX),
            Value::UTinyInt(255),
            Value::USmallInt(u16::MAX),
            Value::UInteger(u32::MAX),
            Value::UBigInt(u64::MAX),
            Value::Float(1.5),
            Value::Double(2.25),
            Value::Text("hello".into()),
            Value::Text("a much longer string that is not inlined".into()),
            Value::Blob(vec![0xAA, 0xBB]),
        ]
    );
}

/// Test decoding of temporal, decimal and UUID columns
#[test]
fn test_temporal_and_decimal_decode() {
    let conn = Connection::open_in_memory().unwrap();
    let row = single_row(
        &conn,
        "SELECT
            DATE '2024-02-29' AS d,
            TIMESTAMP '2024-02-29 12:34:56.789' AS ts,
            INTERVAL 14 MONTH + INTERVAL 3 DAY AS iv,
            12.34::DECIMAL(10, 2) AS dec,
            '7f1b9c2a-7c5e-4a51-9a0e-2f6b5c1d3e4f'::UUID AS id",
        &[],
    );

    assert_eq!(
        row.get::<NaiveDate>(0).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
    );
    let expected: NaiveDateTime = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_milli_opt(12, 34, 56, 789)
        .unwrap();
    assert_eq!(row.get_by_name::<NaiveDateTime>("ts").unwrap(), expected);
    assert_eq!(
        row.get_by_name::<Interval>("iv").unwrap(),
        Interval {
            months: 14,
            days: 3,
            micros: 0
        }
    );
    assert_eq!(
        row.get_by_name::<Decimal>("dec").unwrap(),
        Decimal::new(1234, 2)
    );
    assert_eq!(
        row.get_by_name::<Uuid>("id").unwrap(),
        Uuid::parse_str("7f1b9c2a-7c5e-4a51-9a0e-2f6b5c1d3e4f").unwrap()
    );
}

/// Test decoding of nested columns
#[test]
fn test_nested_types_decode() {
    let conn = Connection::open_in_memory().unwrap();
    let row = single_row(
        &conn,
        "SELECT
            [1, NULL, 3] AS l,
            {'a': 1, 'b': 'x'} AS s,
            MAP {'k': 10} AS m,
            [4, 5]::INTEGER[2] AS arr",
        &[],
    );

    assert_eq!(
        row.value(0),
        Some(&Value::List(vec![
            Value::Integer(1),
            Value::Null,
            Value::Integer(3)
        ]))
    );
    assert_eq!(
        row.value(1),
        Some(&Value::Struct(vec![
            ("a".into(), Value::Integer(1)),
            ("b".into(), Value::Text("x".into())),
        ]))
    );
    assert_eq!(
        row.value(2),
        Some(&Value::Map(vec![(Value::Text("k".into()), Value::Integer(10))]))
    );
    assert_eq!(
        row.value(3),
        Some(&Value::Array(vec![Value::Integer(4), Value::Integer(5)]))
    );
}

/// Test that result sets spanning many chunks are read completely
#[test]
fn test_large_result_spans_chunks() {
    let conn = Connection::open_in_memory().unwrap();
    let rows = conn
        .query(&token(), "SELECT i FROM range(10000) t(i) ORDER BY i", &[])
        .unwrap();
    assert_eq!(rows.column_types(), &[TypeId::BigInt]);

    let mut expected = 0i64;
    for row in rows {
        assert_eq!(row.unwrap().get::<i64>(0).unwrap(), expected);
        expected += 1;
    }
    assert_eq!(expected, 10000);
}

/// Test named, ordinal and positional binding together
#[test]
fn test_parameter_binding() {
    let conn = Connection::open_in_memory().unwrap();

    let row = single_row(
        &conn,
        "SELECT $1::INTEGER + $2::INTEGER",
        &[NamedValue::positional(1), NamedValue::positional(2)],
    );
    assert_eq!(row.get::<i32>(0).unwrap(), 3);

    let row = single_row(
        &conn,
        "SELECT $1::VARCHAR || $2::VARCHAR",
        &[NamedValue::ordinal(2, "b"), NamedValue::ordinal(1, "a")],
    );
    assert_eq!(row.get::<String>(0).unwrap(), "ab");

    let row = single_row(
        &conn,
        "SELECT $greeting::VARCHAR",
        &[NamedValue::named("greeting", "hi")],
    );
    assert_eq!(row.get::<String>(0).unwrap(), "hi");

    let row = single_row(&conn, "SELECT $1::INTEGER IS NULL", &params![None::<i32>]);
    assert!(row.get::<bool>(0).unwrap());
}

/// Test binding values that do not fit the parameter type
#[test]
fn test_binding_errors() {
    let conn = Connection::open_in_memory().unwrap();
    let err = conn
        .exec(&token(), "SELECT $1::INTEGER", &params![1, 2])
        .unwrap_err();
    assert!(err.is_usage() || matches!(err, DuckDbError::CouldNotBind(_)));

    let err = conn
        .exec(
            &token(),
            "SELECT $1::INTEGER[]",
            &[NamedValue::positional(Value::List(vec![Value::Integer(1)]))],
        )
        .unwrap_err();
    assert!(matches!(err, DuckDbError::CouldNotBind(_)));
}

/// Test cancelling a long query and reusing the connection afterwards
#[test]
fn test_cancel_then_reuse() {
    let conn = Connection::open_in_memory().unwrap();
    let token = token();
    let canceller = {
        let token = token.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            token.cancel();
        })
    };

    let err = conn
        .exec(&token, "SELECT SUM(i) FROM range(1000000000000) t(i)", &[])
        .unwrap_err();
    assert!(err.is_cancelled());
    canceller.join().unwrap();

    let row = single_row(&conn, "SELECT 1 + 1", &[]);
    assert_eq!(row.get::<i32>(0).unwrap(), 2);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Sale {
    region: String,
    total: f64,
}

/// Test the async pool end to end
#[tokio::test]
async fn test_pool_round_trip() {
    let pool = DuckDbPool::builder()
        .url("duckdb://:memory:?threads=2")
        .max_connections(2)
        .build()
        .await
        .unwrap();

    let writer = pool.get().await.unwrap();
    writer
        .execute_batch(
            &token(),
            "CREATE TABLE sales (region VARCHAR, amount DOUBLE);
             INSERT INTO sales VALUES ('north', 10), ('north', 5), ('south', 1);",
        )
        .await
        .unwrap();

    let reader = pool.get().await.unwrap();
    let sales: Vec<Sale> = reader
        .query_as(
            &token(),
            "SELECT region, SUM(amount) AS total FROM sales GROUP BY region ORDER BY region",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(
        sales,
        vec![
            Sale {
                region: "north".into(),
                total: 15.0
            },
            Sale {
                region: "south".into(),
                total: 1.0
            },
        ]
    );

    let set = reader
        .query(&token(), "SELECT region FROM sales WHERE amount > $1", &params![6.0])
        .await
        .unwrap();
    let json = set.to_json();
    assert_eq!(json, vec![serde_json::json!({"region": "north"})]);
    let first = Sale::from_json(serde_json::json!({"region": "x", "total": 1.0})).unwrap();
    assert_eq!(first.region, "x");
}
