//! Persistence across program executions.
//!
//! Run `cargo run --example persistent_runs` repeatedly: the first run
//! computes each value (slowly), every later run is instant because the
//! results are read back from disk. Touch this source file and run again to
//! watch the cache invalidate and rebuild.

use memorize::{memorize, set_cache_location, CacheLocation};
use std::time::{Duration, Instant};

#[memorize]
fn exchange_rate(from: &str, to: &str) -> u64 {
    // Stand-in for a deterministic but expensive derivation.
    std::thread::sleep(Duration::from_millis(300));
    (from.len() * 31 + to.len() * 7) as u64
}

fn main() {
    // Store caches beside this source file instead of the working
    // directory, so the demo behaves the same from any invocation cwd.
    set_cache_location(CacheLocation::SourceDir);

    let pairs = [("eur", "usd"), ("gbp", "usd"), ("jpy", "chf")];

    let start = Instant::now();
    for (from, to) in pairs {
        println!("{from}->{to}: {}", exchange_rate(from, to));
    }
    println!("total: {:?} (instant on a warm cache)", start.elapsed());
}
