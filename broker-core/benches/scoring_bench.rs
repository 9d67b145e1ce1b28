//! Benchmarks for bid scoring and ranking.
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use broker_core::domain::{Bid, BidId, BidStatus, Intent, IntentCategory, IntentId, IntentStatus, MinorUnits, ProviderId};
use broker_core::scoring::{rank_bids, score, ScoreWeights};

fn sample_intent() -> Intent {
    let now = Utc::now();
    Intent {
        id: IntentId::new(),
        intent_type: "weather.current".to_string(),
        category: IntentCategory::General,
        client_address: "client-1".to_string(),
        params: serde_json::json!({}),
        max_budget: MinorUnits::from_micros(20_000),
        min_reputation: None,
        created_at: now,
        bidding_deadline: now,
        execution_deadline: now,
        status: IntentStatus::Open,
        assigned_provider: None,
        failover_queue: Default::default(),
        result: None,
        failure_reason: None,
    }
}

fn sample_bid(intent: &Intent, bid_amount: i64, estimated_time_ms: u64, confidence: u8, reputation: f64) -> Bid {
    let now = Utc::now();
    Bid {
        id: BidId::new(),
        intent_id: intent.id,
        provider_id: ProviderId::new(),
        provider_address: "addr".to_string(),
        bid_amount: MinorUnits::from_micros(bid_amount),
        estimated_time_ms,
        confidence,
        reputation_score: reputation,
        tee_attested: false,
        capabilities: vec!["weather.current".to_string()],
        calculated_score: 0,
        rank: 0,
        submitted_at: now,
        expires_at: now,
        status: BidStatus::Pending,
    }
}

fn bench_single_score(c: &mut Criterion) {
    let intent = sample_intent();
    let bid = sample_bid(&intent, 10_000, 500, 90, 4.5);
    let weights = ScoreWeights::default_weights();
    c.bench_function("score_single_bid", |b| {
        b.iter(|| black_box(score(black_box(&bid), black_box(&intent), black_box(&weights))));
    });
}

fn bench_rank_bids(c: &mut Criterion) {
    let intent = sample_intent();
    let weights = ScoreWeights::default_weights();
    let mut group = c.benchmark_group("rank_bids");
    for n in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || {
                    (0..n)
                        .map(|i| sample_bid(&intent, 10_000 - (i as i64 % 50), 200 + (i as u64 % 900), 50 + (i % 50) as u8, (i % 5) as f64))
                        .collect::<Vec<_>>()
                },
                |mut bids| rank_bids(black_box(&mut bids), black_box(&intent), black_box(&weights)),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_score, bench_rank_bids);
criterion_main!(benches);
