//! Benchmarks for directory indexing and fan-out throughput.
//!
//! Run: `cargo bench -p beacon-dispatch`

use async_trait::async_trait;
use beacon_core::error::BeaconResult;
use beacon_core::{AccountRecord, Contact, DispatchConfig, PushMessage};
use beacon_dispatch::{DirectoryIndex, Dispatcher};
use beacon_provider::PushGateway;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;

/// Gateway with a fixed simulated network latency.
struct LatencyGateway(Duration);

#[async_trait]
impl PushGateway for LatencyGateway {
    async fn send(&self, _message: &PushMessage) -> BeaconResult<()> {
        tokio::time::sleep(self.0).await;
        Ok(())
    }
}

fn make_accounts(n: usize) -> Vec<AccountRecord> {
    (0..n)
        .map(|i| {
            AccountRecord::new(format!("u{i}"))
                .with_email(format!("user{i}@example.com"))
                .with_push_token(format!("ExponentPushToken[{i}]"))
        })
        .collect()
}

fn make_contacts(n: usize) -> Vec<Contact> {
    (0..n)
        .map(|i| Contact::new(&format!("User {i}"), &format!("user{i}@example.com")).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmark: directory index construction + resolution
// ---------------------------------------------------------------------------

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for size in [100, 1_000, 10_000] {
        let accounts = make_accounts(size);
        let contacts = make_contacts(50);

        group.bench_with_input(BenchmarkId::new("index", size), &accounts, |b, accts| {
            b.iter(|| {
                let index = DirectoryIndex::build(accts.clone());
                for c in &contacts {
                    black_box(index.resolve(c));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("linear", size), &accounts, |b, accts| {
            b.iter(|| {
                for c in &contacts {
                    black_box(beacon_dispatch::resolver::resolve(c, accts));
                }
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: sequential vs pooled fan-out
// ---------------------------------------------------------------------------

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let index = DirectoryIndex::build(make_accounts(20));
    let contacts = make_contacts(20);

    let mut group = c.benchmark_group("dispatch");
    for concurrency in [1, 4, 16] {
        let config = DispatchConfig {
            max_concurrent: concurrency,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(
            Arc::new(LatencyGateway(Duration::from_millis(1))),
            config,
        )
        .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &dispatcher,
            |b, d| {
                b.to_async(&rt)
                    .iter(|| async { black_box(d.dispatch(&contacts, "bench", &index).await) });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_dispatch);
criterion_main!(benches);
