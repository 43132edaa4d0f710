//! Bulk loading and scan benchmarks.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ducklink_driver::{CancellationToken, Connection, NamedValue, Value, params};
use tokio::runtime::Runtime;

const SCHEMA: &str = "CREATE TABLE events (id BIGINT, name VARCHAR, score DOUBLE)";

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&CancellationToken::new(), SCHEMA).unwrap();
    conn
}

fn row(i: usize) -> [Value; 3] {
    [
        Value::BigInt(i as i64),
        Value::Text(format!("event-{i}")),
        Value::Double(i as f64 * 0.5),
    ]
}

fn bench_appender(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_insert");

    for rows in [1_000usize, 10_000] {
        group.throughput(Throughput::Elements(rows as u64));

        group.bench_with_input(BenchmarkId::new("appender", rows), &rows, |b, &rows| {
            b.iter_batched(
                setup,
                |conn| {
                    {
                        let mut appender = conn.appender(None, None, "events").unwrap();
                        for i in 0..rows {
                            appender.append_row(&row(i)).unwrap();
                        }
                        appender.close().unwrap();
                    }
                    black_box(conn)
                },
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("prepared_insert", rows), &rows, |b, &rows| {
            let token = CancellationToken::new();
            b.iter_batched(
                setup,
                |conn| {
                    {
                        let mut stmt = conn.prepare("INSERT INTO events VALUES ($1, $2, $3)").unwrap();
                        for i in 0..rows {
                            let args: Vec<NamedValue> =
                                row(i).into_iter().map(NamedValue::positional).collect();
                            stmt.exec(&token, &args).unwrap();
                        }
                    }
                    black_box(conn)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let conn = setup();
    let token = CancellationToken::new();
    conn.execute_batch(
        &token,
        "INSERT INTO events SELECT i, 'event-' || i, i * 0.5 FROM range(100000) t(i)",
    )
    .unwrap();

    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Elements(100_000));
    group.bench_function("decode_all_rows", |b| {
        b.iter(|| {
            let rows = conn
                .query(&token, "SELECT * FROM events", &[])
                .unwrap()
                .collect_rows()
                .unwrap();
            black_box(rows.len())
        });
    });
    group.bench_function("filtered_with_params", |b| {
        b.iter(|| {
            let rows = conn
                .query(&token, "SELECT name FROM events WHERE id < $1", &params![1000i64])
                .unwrap()
                .collect_rows()
                .unwrap();
            black_box(rows.len())
        });
    });
    group.finish();
}

fn bench_pool(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool = rt
        .block_on(ducklink_driver::DuckDbPool::new(
            ducklink_driver::DuckDbConfig::in_memory(),
        ))
        .unwrap();
    let token = CancellationToken::new();

    c.bench_function("pool_select_one", |b| {
        b.to_async(&rt).iter(|| async {
            let conn = pool.get().await.unwrap();
            black_box(conn.query(&token, "SELECT 1", &[]).await.unwrap())
        });
    });
}

criterion_group!(benches, bench_appender, bench_scan, bench_pool);
criterion_main!(benches);
