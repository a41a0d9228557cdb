use rayon::prelude::*;
use std::sync::Arc;
use utils::SpinLock;

/// Concurrent increments must never be lost.
#[test]
fn concurrent_increments() {
    let counter = SpinLock::new(0usize);
    (0..10_000).into_par_iter().for_each(|_| {
        *counter.lock() += 1;
    });
    assert_eq!(counter.into_inner(), 10_000);
}

#[test]
fn concurrent_accumulation_from_threads() {
    let sum = Arc::new(SpinLock::new([0.0f64; 3]));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let sum = Arc::clone(&sum);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let mut s = sum.lock();
                    s[0] += 1.0;
                    s[1] += t as f64;
                    s[2] -= 1.0;
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let s = *sum.lock();
    assert_eq!(s, [4000.0, 6000.0, -4000.0]);
}
