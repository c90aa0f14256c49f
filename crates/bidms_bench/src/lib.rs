//! Benchmark utilities for BiDMS structures.
//!
//! Run with `cargo bench -p bidms_bench`.

use rand::seq::SliceRandom;
use rand::Rng;

/// Keys `0..count` in random order.
pub fn shuffled_keys(count: usize) -> Vec<i64> {
    let mut keys: Vec<i64> = (0..count as i64).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Random lowercase texts over a four-letter alphabet.
pub fn random_texts(count: usize, len: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| (0..len).map(|_| rng.gen_range(b'a'..=b'd') as char).collect())
        .collect()
}
