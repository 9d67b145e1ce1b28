//! Benchmarks for the push fan-out layer's emit/flush hot path.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::sync::mpsc;

use broker_core::domain::{Provider, ProviderId};
use broker_core::push::{PushConfig, PushEvent, PushLayer, RoomId};

fn sample_provider() -> Provider {
    Provider::new(
        "addr".to_string(),
        "p".to_string(),
        ["weather.current".to_string()].into_iter().collect(),
        false,
        chrono::Utc::now(),
    )
}

fn bench_emit_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_emit_fanout");
    for subscriber_count in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(subscriber_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(subscriber_count), &subscriber_count, |b, &n| {
            let layer = PushLayer::new(PushConfig::default());
            let mut _txs = Vec::with_capacity(n);
            for _ in 0..n {
                let (tx, rx) = mpsc::channel(1024);
                let conn = layer.connect(false, None, tx);
                layer.join(conn, RoomId::Providers);
                _txs.push(rx);
            }
            b.iter(|| {
                layer.emit(black_box(PushEvent::ProviderUpdated {
                    provider: sample_provider(),
                }));
            });
        });
    }
    group.finish();
}

fn bench_flush_once(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_flush_once");
    for subscriber_count in [10usize, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(subscriber_count), &subscriber_count, |b, &n| {
            b.iter_batched(
                || {
                    let layer = PushLayer::new(PushConfig::default());
                    let mut rxs = Vec::with_capacity(n);
                    for _ in 0..n {
                        let (tx, rx) = mpsc::channel(1024);
                        let conn = layer.connect(false, None, tx);
                        layer.join(conn, RoomId::Providers);
                        rxs.push(rx);
                    }
                    for _ in 0..20 {
                        layer.emit(PushEvent::ProviderUpdated { provider: sample_provider() });
                    }
                    (layer, rxs)
                },
                |(layer, rxs)| {
                    layer.flush_once();
                    black_box(rxs);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_emit_fanout, bench_flush_once);
criterion_main!(benches);
