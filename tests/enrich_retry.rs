// tests/enrich_retry.rs
mod common;

use async_trait::async_trait;
use common::{FlakySource, TableSource};
use hn_order_verify::{EnrichmentClient, FetchError, Item, RetryPolicy, TimestampSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Paused-clock timers land on millisecond ticks; allow one tick of slack.
fn assert_about(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected about {expected:?}, got {actual:?}"
    );
}

/// Always fails and remembers when each attempt happened.
struct DownSource {
    seen_at: Mutex<Vec<Instant>>,
}

#[async_trait]
impl TimestampSource for DownSource {
    async fn lookup(&self, _id: &str) -> Result<i64, FetchError> {
        self.seen_at.lock().unwrap().push(Instant::now());
        Err(FetchError::Status(500))
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_wait_base_then_double() {
    let src = Arc::new(DownSource {
        seen_at: Mutex::new(Vec::new()),
    });
    let client = EnrichmentClient::new(src.clone(), RetryPolicy::default());

    let t0 = Instant::now();
    let err = client.fetch_timestamp("42").await.unwrap_err();
    let elapsed = t0.elapsed();

    match err {
        FetchError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, FetchError::Status(500)));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }

    let seen = src.seen_at.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_about(seen[1] - seen[0], Duration::from_millis(1000));
    assert_about(seen[2] - seen[1], Duration::from_millis(2000));
    // No delay after the final attempt.
    assert_about(elapsed, Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn later_attempt_can_succeed_after_different_errors() {
    let src = Arc::new(FlakySource {
        failures: 2,
        ts: 1_700_000_000,
        calls: AtomicUsize::new(0),
    });
    let client = EnrichmentClient::new(src.clone(), RetryPolicy::default());

    let ts = client.fetch_timestamp("7").await.unwrap();
    assert_eq!(ts, 1_700_000_000);
    assert_eq!(src.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn single_attempt_policy_never_sleeps() {
    let src = Arc::new(DownSource {
        seen_at: Mutex::new(Vec::new()),
    });
    let policy = RetryPolicy {
        attempts: 1,
        ..RetryPolicy::default()
    };
    let client = EnrichmentClient::new(src.clone(), policy);

    let t0 = Instant::now();
    assert!(client.fetch_timestamp("1").await.is_err());
    assert_eq!(t0.elapsed(), Duration::ZERO);
    assert_eq!(src.seen_at.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn one_failing_id_does_not_affect_siblings() {
    let src = Arc::new(TableSource::new(&[("1", 100), ("2", 90), ("4", 70), ("5", 60)]));
    let client = EnrichmentClient::new(src.clone(), RetryPolicy::default());
    let items: Vec<Item> = ["1", "2", "3", "4", "5"]
        .iter()
        .map(|id| Item::new(*id, "t", "1 minute ago"))
        .collect();

    let batch = client.enrich_all(&items).await;

    assert_eq!(batch.outcomes.len(), 5);
    let ids: Vec<&str> = batch.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(batch.succeeded(), 4);

    let failed: Vec<&str> = batch.failures().map(|(id, _)| id).collect();
    assert_eq!(failed, vec!["3"]);
    assert_eq!(src.calls_for("3"), 3);
    assert_eq!(src.calls_for("1"), 1);

    let ts = batch.timestamps();
    assert_eq!(ts.get("5"), Some(&60));
    assert!(!ts.contains_key("3"));
}

/// Sleeps inside each lookup and tracks how many run at once.
struct SlowSource {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl TimestampSource for SlowSource {
    async fn lookup(&self, id: &str) -> Result<i64, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        id.parse::<i64>().map_err(|e| FetchError::Malformed(e.to_string()))
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

fn numbered_items(n: usize) -> Vec<Item> {
    (1..=n)
        .map(|i| Item::new(i.to_string(), "t", "1 minute ago"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn uncapped_enrichment_runs_everything_at_once() {
    let src = Arc::new(SlowSource {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let client = EnrichmentClient::new(src.clone(), RetryPolicy::default());

    let t0 = Instant::now();
    let batch = client.enrich_all(&numbered_items(6)).await;
    assert_eq!(batch.succeeded(), 6);
    assert_eq!(src.peak.load(Ordering::SeqCst), 6);
    assert_about(t0.elapsed(), Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn concurrency_cap_limits_in_flight_lookups() {
    let src = Arc::new(SlowSource {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let client =
        EnrichmentClient::new(src.clone(), RetryPolicy::default()).with_max_concurrency(Some(2));

    let t0 = Instant::now();
    let batch = client.enrich_all(&numbered_items(6)).await;
    assert_eq!(batch.succeeded(), 6);
    assert_eq!(src.peak.load(Ordering::SeqCst), 2);
    assert_about(t0.elapsed(), Duration::from_millis(300));
}
