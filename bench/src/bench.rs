//! Adaptive load harness.
//!
//! Keys `{prefix}0 .. {prefix}{count - 1}` are set to their index in batches
//! of concurrent operations. The batch size starts at one and doubles after
//! every batch up to a ceiling. Failed sets are retried ahead of new keys in
//! the next batch, each with a fresh lookup. Once every key has landed, a
//! verification pass reads them all back.

use {
    crate::stats::Stats,
    futures::future::join_all,
    hamt_client::{Gateway, HamtClient, HamtError, Result, SetOutcome},
    log::*,
    solana_sdk::pubkey::Pubkey,
    std::time::Duration,
};

pub const DEFAULT_KEY_PREFIX: &str = "test";
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

#[derive(Clone, Debug)]
pub struct BenchConfig {
    /// Number of keys to set.
    pub count: u64,
    pub key_prefix: String,
    /// Ceiling for the concurrency window.
    pub max_batch_size: usize,
    /// Failed attempts tolerated per key; `None` retries until success.
    pub max_retries: Option<usize>,
    /// Pause before a batch that carries retries.
    pub retry_delay: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            count: 0,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_retries: None,
            retry_delay: Duration::ZERO,
        }
    }
}

impl BenchConfig {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn key(&self, index: u64) -> String {
        format!("{}{}", self.key_prefix, index)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BenchReport {
    /// Batches issued.
    pub iterations: usize,
    /// Set attempts issued, retries included.
    pub attempts: usize,
    pub retries: usize,
    /// Keys issued so far, after each batch.
    pub lowest_set_progress: Vec<u64>,
    /// Attempts in each batch.
    pub batch_sizes: Vec<usize>,
    pub new_records: usize,
    pub latency_ms: Stats,
    pub fee: Stats,
    pub rent: Stats,
    pub compute_units: Stats,
}

impl BenchReport {
    fn record(&mut self, outcome: &SetOutcome) {
        self.new_records += outcome.new_records.len();
        self.latency_ms.add(outcome.outcome.elapsed_ms);
        self.fee.add(outcome.outcome.fee);
        self.rent.add(outcome.outcome.rent);
        self.compute_units.add(outcome.outcome.compute_units);
    }

    pub fn log_summary(&self) {
        info!(
            "{} sets in {} batches ({} retries), {} collision nodes allocated",
            self.latency_ms.count, self.iterations, self.retries, self.new_records
        );
        info!("latency ms: {}", self.latency_ms);
        info!("fee: {}", self.fee);
        info!("rent: {}", self.rent);
        info!("compute units: {}", self.compute_units);
    }
}

struct PendingSet {
    index: u64,
    failures: usize,
}

/// Sets `config.count` keys in the trie at `state`, growing concurrency as
/// batches complete and retrying failed sets until they land.
pub async fn run_bench<G: Gateway>(
    client: &HamtClient<G>,
    state: &Pubkey,
    config: &BenchConfig,
) -> Result<BenchReport> {
    let highest_set = config.count;
    let max_batch_size = config.max_batch_size.max(1);
    let mut lowest_set = 0u64;
    let mut batch_size = 1usize;
    let mut error_sets: Vec<PendingSet> = Vec::new();
    let mut report = BenchReport::default();

    while lowest_set < highest_set || !error_sets.is_empty() {
        let retry_count = error_sets.len().min(batch_size);
        let mut batch = error_sets.drain(..retry_count).collect::<Vec<_>>();
        let new_count = ((batch_size - retry_count) as u64).min(highest_set - lowest_set);
        batch.extend((lowest_set..lowest_set + new_count).map(|index| PendingSet {
            index,
            failures: 0,
        }));

        if retry_count > 0 && !config.retry_delay.is_zero() {
            tokio::time::sleep(config.retry_delay).await;
        }

        let results = join_all(batch.iter().map(|pending| {
            let key = config.key(pending.index);
            let value = pending.index;
            async move { client.set(state, &key, value).await }
        }))
        .await;

        report.iterations += 1;
        report.attempts += batch.len();
        report.retries += retry_count;
        report.batch_sizes.push(batch.len());
        lowest_set += new_count;
        report.lowest_set_progress.push(lowest_set);

        let mut failed = 0;
        for (mut pending, result) in batch.into_iter().zip(results) {
            match result {
                Ok(outcome) => report.record(&outcome),
                Err(err) if err.is_retryable() => {
                    failed += 1;
                    pending.failures += 1;
                    let key = config.key(pending.index);
                    warn!("set {key:?} failed ({} failures): {err}", pending.failures);
                    if config
                        .max_retries
                        .is_some_and(|max_retries| pending.failures > max_retries)
                    {
                        return Err(HamtError::RetriesExhausted {
                            key,
                            attempts: pending.failures,
                        });
                    }
                    error_sets.push(pending);
                }
                Err(err) => {
                    error!("set {:?} failed: {err}", config.key(pending.index));
                    return Err(err);
                }
            }
        }

        info!(
            "batch {}: {} sets, {} retried, {} failed, {}/{} keys issued",
            report.iterations,
            report.batch_sizes[report.iterations - 1],
            retry_count,
            failed,
            lowest_set,
            highest_set
        );
        batch_size = batch_size.saturating_mul(2).min(max_batch_size);
    }

    Ok(report)
}

/// Reads every benchmark key back, one at a time, and checks it holds its
/// index.
pub async fn verify<G: Gateway>(
    client: &HamtClient<G>,
    state: &Pubkey,
    config: &BenchConfig,
) -> Result<()> {
    let root = client.read_state(state).await?.root;
    for index in 0..config.count {
        let key = config.key(index);
        let lookup = client.lookup(&root, &key).await?;
        if lookup.value != Some(index) {
            error!("verification failed for {key:?}: {:?}", lookup.value);
            return Err(HamtError::Verification {
                key,
                expected: index,
                actual: lookup.value,
            });
        }
    }
    info!("verified {} keys", config.count);
    Ok(())
}
