//! Performance benchmarks for event-pump
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use event_pump::{subscriber, EventPump, ManualScheduler, TokioScheduler};

fn bench_publish_drain_cycle(c: &mut Criterion) {
    let scheduler = ManualScheduler::new();
    let pump = EventPump::new(scheduler.clone());
    pump.subscribe("market.forex", subscriber(|_, _, _| Ok(()))).unwrap();
    scheduler.run_pending();

    c.bench_function("publish + drain (1 subscriber)", |b| {
        b.iter(|| {
            pump.publish("market.forex", serde_json::json!({"rate": 7.35}))
                .unwrap();
            scheduler.run_pending();
        });
    });
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for count in [10, 100, 1000] {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());
        for _ in 0..count {
            pump.subscribe("market.forex", subscriber(|_, _, _| Ok(()))).unwrap();
        }
        scheduler.run_pending();

        group.bench_function(format!("{} subscribers", count), |b| {
            b.iter(|| {
                pump.publish("market.forex", serde_json::json!({"rate": 7.35}))
                    .unwrap();
                scheduler.run_pending();
            });
        });
    }
    group.finish();
}

fn bench_batch_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_throughput");
    for count in [10, 100, 1000] {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());
        pump.subscribe("market.", subscriber(|_, _, _| Ok(()))).unwrap();
        scheduler.run_pending();

        group.bench_function(format!("{} events per batch", count), |b| {
            b.iter(|| {
                for i in 0..count {
                    pump.publish("market.forex", serde_json::json!({"i": i}))
                        .unwrap();
                }
                scheduler.run_pending();
            });
        });
    }
    group.finish();
}

fn bench_wildcard_matching(c: &mut Criterion) {
    let scheduler = ManualScheduler::new();
    let pump = EventPump::new(scheduler.clone());
    pump.subscribe("market", subscriber(|_, _, _| Ok(()))).unwrap();
    pump.subscribe("market..usd", subscriber(|_, _, _| Ok(()))).unwrap();
    pump.subscribe("", subscriber(|_, _, _| Ok(()))).unwrap();
    scheduler.run_pending();

    c.bench_function("publish deep name (3 wildcard patterns)", |b| {
        b.iter(|| {
            pump.publish("market.forex.usd.spot", serde_json::json!({"rate": 7.35}))
                .unwrap();
            scheduler.run_pending();
        });
    });
}

fn bench_tokio_scheduler(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("publish with completion (tokio)", |b| {
        b.to_async(&rt).iter(|| async {
            let pump = EventPump::new(TokioScheduler::current());
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<usize>();
            pump.publish_with_completion(
                "market.forex",
                serde_json::json!({"rate": 7.35}),
                event_pump::completion(move |n| {
                    let _ = tx.send(n);
                    Ok(())
                }),
            )
            .unwrap();
            rx.recv().await.unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_publish_drain_cycle,
    bench_fan_out,
    bench_batch_throughput,
    bench_wildcard_matching,
    bench_tokio_scheduler,
);
criterion_main!(benches);
