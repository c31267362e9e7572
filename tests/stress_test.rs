//! Stress tests for the kriya runtime

use kriya::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn stress_test_spawn_retrieve_cycles() {
    let rt = Runtime::new().unwrap();

    for round in 0..20u32 {
        let tasks: Vec<_> = (0..3u32)
            .map(|i| rt.spawn(|r: u32, i: u32| r * 10 + i, (round, i)).unwrap())
            .collect();

        let results: Vec<u32> = tasks.into_iter().map(Task::retrieve).collect();
        assert_eq!(
            results,
            vec![round * 10, round * 10 + 1, round * 10 + 2],
            "Round {}",
            round
        );
    }

    rt.shutdown();
}

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_tasks() {
    let rt = Runtime::new().unwrap();

    let tasks: Vec<_> = (0..10_000u64)
        .map(|i| rt.spawn(|x: u64| x.wrapping_mul(x), (i,)).unwrap())
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let i = i as u64;
        assert_eq!(task.retrieve(), i.wrapping_mul(i));
    }

    rt.shutdown();
}

#[test]
#[ignore]
fn stress_test_many_producers() {
    let rt = Runtime::new().unwrap();
    let total = Arc::new(Mutex::new(0u64));

    std::thread::scope(|s| {
        for producer in 0..8u64 {
            let rt = &rt;
            let total = total.clone();
            s.spawn(move || {
                for i in 0..500u64 {
                    let value = rt
                        .spawn(|p: u64, i: u64| p * 1_000 + i, (producer, i))
                        .unwrap()
                        .retrieve();
                    assert_eq!(value, producer * 1_000 + i);
                    *total.lock() += 1;
                }
            });
        }
    });

    assert_eq!(*total.lock(), 4_000);
    assert_eq!(rt.queued_tasks(), 0);
    rt.shutdown();
}

#[test]
#[ignore]
fn stress_test_abandoned_tasks_drain() {
    for _ in 0..10 {
        let rt = Runtime::new().unwrap();
        let counter = Arc::new(Mutex::new(0usize));

        for _ in 0..1_000 {
            let counter = counter.clone();
            let _ = rt.spawn(move || *counter.lock() += 1, ()).unwrap();
        }

        rt.shutdown();
        assert_eq!(*counter.lock(), 1_000);
    }
}
