//! Drives concurrent sets against a HAMT and reports what they cost.

mod bench;
mod stats;

pub use {
    bench::{
        run_bench, verify, BenchConfig, BenchReport, DEFAULT_KEY_PREFIX, DEFAULT_MAX_BATCH_SIZE,
    },
    stats::Stats,
};
