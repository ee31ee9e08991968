//! Stable scheduling jitter (spec.md §4.2/§8). Each Monitor's check moments
//! must wobble within `jitterPercent` of its interval, but must NOT move
//! around between operator restarts — so the jitter for a given
//! namespace/name pair is derived from a fixed-seed hash rather than a
//! random number generator.

use std::hash::{Hash, Hasher};

/// `std::collections::hash_map::DefaultHasher` behind a fixed seed: unlike
/// `RandomState`, its output is stable across process invocations, which is
/// the entire point here.
fn stable_hash(namespace: &str, name: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    0xA5A5_5A5A_u64.hash(&mut hasher);
    namespace.hash(&mut hasher);
    name.hash(&mut hasher);
    hasher.finish()
}

/// Normalizes `stable_hash` into `[0, 1)`.
fn unit_interval(namespace: &str, name: &str) -> f64 {
    (stable_hash(namespace, name) as f64) / (u64::MAX as f64)
}

/// Jitter in milliseconds to add to a Monitor's next-check moment, stable
/// across restarts, bounded by `jitter_percent` of `interval_secs`.
pub fn jitter_ms(namespace: &str, name: &str, jitter_percent: u32, interval_secs: u32) -> u64 {
    if jitter_percent == 0 || interval_secs == 0 {
        return 0;
    }
    let interval_ms = interval_secs as f64 * 1000.0;
    let max_jitter_ms = interval_ms * (jitter_percent as f64 / 100.0);
    (unit_interval(namespace, name) * max_jitter_ms) as u64
}
