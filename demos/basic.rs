//! Basic memoization: the second call never reevaluates the function.
//!
//! Run with `cargo run --example basic`. Run it twice: the second run
//! answers from the `.cache` file written by the first.

use memorize::memorize;
use std::time::{Duration, Instant};

#[memorize]
fn slow_square(n: u64) -> u64 {
    // Stand-in for an expensive computation.
    std::thread::sleep(Duration::from_millis(500));
    n * n
}

fn main() {
    for round in 1..=2 {
        let start = Instant::now();
        let result = slow_square(12);
        println!(
            "round {round}: slow_square(12) = {result} ({:?})",
            start.elapsed()
        );
    }

    println!("cache file: slow_square caches under basic_slow_square.cache");
}
