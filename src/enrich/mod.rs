// src/enrich/mod.rs
pub mod hn_api;
pub mod types;

use crate::enrich::types::{FetchError, TimestampSource};
use crate::listing::types::Item;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("enrich_attempts_total", "Item lookups attempted.");
        describe_counter!(
            "enrich_retries_total",
            "Item lookups retried after a failed attempt."
        );
        describe_counter!(
            "enrich_failures_total",
            "Items whose lookup failed on every attempt."
        );
        describe_histogram!("enrich_fetch_ms", "Single lookup time in milliseconds.");
    });
}

/// Exponential backoff without jitter: attempt `i` (0-based) that fails
/// waits `base_delay * multiplier^i`, except the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt_index))
    }
}

/// Per-item result of the enrichment step.
#[derive(Debug)]
pub struct EnrichmentOutcome {
    pub id: String,
    pub result: Result<i64, FetchError>,
}

/// Outcomes for a whole batch, in the order the items were given.
#[derive(Debug, Default)]
pub struct EnrichmentBatch {
    pub outcomes: Vec<EnrichmentOutcome>,
}

impl EnrichmentBatch {
    pub fn timestamps(&self) -> HashMap<String, i64> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|ts| (o.id.clone(), *ts)))
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.id.as_str(), e)))
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }
}

/// Looks up authoritative timestamps with retry and backoff.
#[derive(Clone)]
pub struct EnrichmentClient {
    source: Arc<dyn TimestampSource>,
    policy: RetryPolicy,
    max_concurrency: Option<usize>,
}

impl EnrichmentClient {
    pub fn new(source: Arc<dyn TimestampSource>, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            max_concurrency: None,
        }
    }

    /// Cap the number of lookups in flight. `None` means no cap.
    pub fn with_max_concurrency(mut self, cap: Option<usize>) -> Self {
        self.max_concurrency = cap.map(|n| n.max(1));
        self
    }

    /// Look up one id, retrying failed attempts. Fails with
    /// `FetchError::Exhausted` carrying the last attempt's error.
    pub async fn fetch_timestamp(&self, id: &str) -> Result<i64, FetchError> {
        ensure_metrics_described();
        let attempts = self.policy.attempts.max(1);

        let mut attempt = 0u32;
        loop {
            let t0 = Instant::now();
            counter!("enrich_attempts_total").increment(1);
            let res = self.source.lookup(id).await;
            histogram!("enrich_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

            match res {
                Ok(ts) => return Ok(ts),
                Err(e) if attempt + 1 < attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::info!(
                        id,
                        attempt = attempt + 1,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "lookup failed, retrying"
                    );
                    counter!("enrich_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        id,
                        attempts,
                        source = self.source.name(),
                        error = %e,
                        "lookup failed on every attempt"
                    );
                    return Err(FetchError::Exhausted {
                        attempts,
                        last: Box::new(e),
                    });
                }
            }
        }
    }

    /// Look up every item concurrently. Never fails as a whole: each item
    /// gets its own outcome, and one item's failure does not cancel others.
    pub async fn enrich_all(&self, items: &[Item]) -> EnrichmentBatch {
        ensure_metrics_described();
        let limiter = self.max_concurrency.map(Semaphore::new);
        let limiter = limiter.as_ref();

        let lookups = items.iter().map(|item| async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = match limiter {
                Some(sem) => sem.acquire().await.ok(),
                None => None,
            };
            let result = self.fetch_timestamp(item.id()).await;
            if result.is_err() {
                counter!("enrich_failures_total").increment(1);
            }
            EnrichmentOutcome {
                id: item.id().to_string(),
                result,
            }
        });

        let outcomes = join_all(lookups).await;
        let batch = EnrichmentBatch { outcomes };
        tracing::info!(
            items = items.len(),
            succeeded = batch.succeeded(),
            failed = items.len() - batch.succeeded(),
            "enrichment finished"
        );
        batch
    }
}
