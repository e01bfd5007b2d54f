mod common;
use common::*;
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use orderflow_core::prelude::*;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

fn bench_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching for 10k resting orders");
    group.throughput(Throughput::Elements(10_000));
    group.bench_function("sweep 10k resting sells with one crossing buy", |b| {
        b.iter_batched(
            || {
                let handler = MarketHandler::new("ETH-DAI".to_string(), 8, vec![]);
                for i in 0..10_000u64 {
                    let mut sell = make_limit_order(i, Side::Sell, 1000 + (i % 500), 10, 3000 + i);
                    handler.handle_new_order(&mut sell).unwrap();
                }
                let taker = make_limit_order(20_000, Side::Buy, 1500, 10_000 * 10, 4000);
                (handler, taker)
            },
            |(handler, mut taker)| {
                handler.handle_new_order(&mut taker).unwrap();
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn stress_multi_thread_benchmark(c: &mut Criterion) {
    let dispatcher = Arc::new(EngineDispatcher::new(EngineConfig::default(), vec![]));

    let insert_counter = Arc::new(AtomicU64::new(0));
    let cancel_counter = Arc::new(AtomicU64::new(0));

    let mut group = c.benchmark_group("stress dispatch");
    group.throughput(Throughput::Elements(1));
    group.bench_function("concurrent new-order/cancel event handling TPS", |b| {
        let running = Arc::new(AtomicBool::new(true));

        let dispatcher_insert = Arc::clone(&dispatcher);
        let insert_counter_clone = Arc::clone(&insert_counter);
        let insert_thread_running = running.clone();
        let insert_thread = thread::spawn(move || {
            let mut i = 0u64;
            while insert_thread_running.load(Ordering::Relaxed) {
                i += 1;
                let mut rng = rand::rng();
                let is_market = rng.random_bool(0.3);
                let is_buy = rng.random_bool(0.5);
                let side = if is_buy { Side::Buy } else { Side::Sell };
                let order = if is_market {
                    make_market_order(i, side, 10, 2000 + i)
                } else {
                    make_limit_order(i, side, 1000 - (i % 500), 10, 1000 + i)
                };
                let event = serde_json::json!({
                    "eventType": "EVENT/NEW_ORDER",
                    "marketID": "ETH-DAI",
                    "order": {
                        "id": order.id,
                        "side": order.side,
                        "type": order.kind,
                        "trader": order.trader,
                        "price": order.price.to_string(),
                        "amount": order.amount().to_string(),
                    },
                });
                dispatcher_insert.handle_raw_event(event.to_string().as_bytes());
                insert_counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        });

        let dispatcher_cancel = Arc::clone(&dispatcher);
        let cancel_counter_clone = Arc::clone(&cancel_counter);
        let cancel_thread_running = running.clone();
        let cancel_thread = thread::spawn(move || {
            let mut rng = rand::rng();
            while cancel_thread_running.load(Ordering::Relaxed) {
                let random_id: u64 = rng.random_range(0..100_000_000);
                let event = serde_json::json!({
                    "eventType": "EVENT/EVENT_CANCEL_ORDER",
                    "marketID": "ETH-DAI",
                    "id": random_id.to_string(),
                    "price": "0",
                    "side": "buy",
                });
                dispatcher_cancel.handle_raw_event(event.to_string().as_bytes());
                cancel_counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        });

        b.iter(|| {
            std::thread::yield_now();
        });

        running.store(false, Ordering::Relaxed);
        insert_thread.join().unwrap();
        cancel_thread.join().unwrap();
    });
    group.finish();
}

criterion_group!(benches, bench_matching, stress_multi_thread_benchmark);
criterion_main!(benches);
