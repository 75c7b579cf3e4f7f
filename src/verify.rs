//! # Verification Orchestrator
//! Runs the checks over one collected listing:
//! `Collected → VisualChecked → Enriching → ApiChecked → Done`.
//!
//! No stage is retried or rolled back. A failing stage only degrades its own
//! result; lookups that fail just shrink the set of pairs the API check can
//! compare.

use chrono::{DateTime, Utc};
use metrics::{describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::age;
use crate::enrich::EnrichmentClient;
use crate::listing::types::{Item, OrderedList};
use crate::order::{validate, CheckLog, OrderCheck, OrderReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Collected,
    VisualChecked,
    Enriching,
    ApiChecked,
    Done,
}

/// Condensed result of one order check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckSummary {
    pub label: String,
    pub all_in_order: bool,
    pub compared: usize,
    pub ties: usize,
    pub inverted: usize,
    pub skipped: usize,
    pub lines: Vec<String>,
}

impl<K> From<&OrderReport<K>> for CheckSummary {
    fn from(r: &OrderReport<K>) -> Self {
        Self {
            label: r.check.label.to_string(),
            all_in_order: r.all_in_order,
            compared: r.compared(),
            ties: r.ties(),
            inverted: r.inverted(),
            skipped: r.skipped(),
            lines: r.lines().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub id: String,
    pub reason: String,
}

/// What a finished run hands to the report emitter.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationSummary {
    pub item_count: usize,
    pub target_count: usize,
    /// Set by callers that know how many listing pages were visited.
    pub pages_visited: Option<usize>,
    pub visual_pass: bool,
    pub api_pass: bool,
    pub visual: CheckSummary,
    pub api: CheckSummary,
    pub enriched: usize,
    pub enrichment_failures: Vec<EnrichmentFailure>,
    pub elapsed_secs: f64,
    pub generated_at: DateTime<Utc>,
    pub stages: Vec<Stage>,
}

impl VerificationSummary {
    pub fn reached_target(&self) -> bool {
        self.item_count == self.target_count
    }

    /// At least one API pair could be compared. A listing with fewer than
    /// two items has no pairs and counts as verified.
    pub fn api_verified(&self) -> bool {
        self.item_count < 2 || self.api.compared > 0
    }

    /// Both checks passed on real comparisons and the full target count was checked.
    pub fn passed(&self) -> bool {
        self.visual_pass && self.api_pass && self.api_verified() && self.reached_target()
    }

    fn api_word(&self) -> &'static str {
        if !self.api_pass {
            "fail"
        } else if !self.api_verified() {
            "unverified"
        } else {
            "pass"
        }
    }

    pub fn verdict_line(&self) -> String {
        let failed_lookups = self.enrichment_failures.len();
        if self.passed() {
            let mut line = format!(
                "Both visual and API checks passed. The {} items checked are in correct chronological order.",
                self.item_count
            );
            if self.api.skipped > 0 || failed_lookups > 0 {
                line.push_str(&format!(
                    " {} API pair(s) skipped, {} lookup(s) failed.",
                    self.api.skipped, failed_lookups
                ));
            }
            line
        } else {
            format!(
                "Some checks failed (visual: {}, api: {}). Only {} of {} items were checked, {} API pair(s) skipped, {} lookup(s) failed. Review the check lines for details.",
                pass_word(self.visual_pass),
                self.api_word(),
                self.item_count,
                self.target_count,
                self.api.skipped,
                failed_lookups
            )
        }
    }
}

fn pass_word(pass: bool) -> &'static str {
    if pass {
        "pass"
    } else {
        "fail"
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_gauge!("verify_items_checked", "Items in the last verified listing.");
    });
}

/// Single-use orchestrator; `run` consumes it.
pub struct Verifier {
    enrichment: EnrichmentClient,
    target_count: usize,
    log: Arc<dyn CheckLog>,
    started: Instant,
    stages: Vec<Stage>,
}

impl Verifier {
    /// The elapsed time in the summary is measured from here, so create the
    /// verifier before collecting if collection time should count.
    pub fn new(enrichment: EnrichmentClient, target_count: usize, log: Arc<dyn CheckLog>) -> Self {
        Self {
            enrichment,
            target_count,
            log,
            started: Instant::now(),
            stages: Vec::with_capacity(5),
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::info!(stage = ?next, "verification stage");
        self.stages.push(next);
    }

    pub async fn run(mut self, mut list: OrderedList) -> VerificationSummary {
        ensure_metrics_described();

        self.advance(Stage::Collected);
        if list.len() < self.target_count {
            tracing::warn!(
                collected = list.len(),
                target = self.target_count,
                "short listing, checking what was collected"
            );
        }

        let visual = validate(
            list.items(),
            |it: &Item| Some(age::normalize(it.relative_age_text())),
            OrderCheck::VISUAL,
            self.log.as_ref(),
        );
        self.advance(Stage::VisualChecked);

        self.advance(Stage::Enriching);
        let batch = self.enrichment.enrich_all(list.items()).await;
        let enriched = list.apply_timestamps(&batch.timestamps());
        let enrichment_failures: Vec<EnrichmentFailure> = batch
            .failures()
            .map(|(id, e)| EnrichmentFailure {
                id: id.to_string(),
                reason: e.to_string(),
            })
            .collect();

        let api = validate(
            list.items(),
            |it: &Item| it.authoritative_timestamp(),
            OrderCheck::API,
            self.log.as_ref(),
        );
        self.advance(Stage::ApiChecked);

        gauge!("verify_items_checked").set(list.len() as f64);
        self.advance(Stage::Done);

        let summary = VerificationSummary {
            item_count: list.len(),
            target_count: self.target_count,
            pages_visited: None,
            visual_pass: visual.all_in_order,
            api_pass: api.all_in_order,
            visual: CheckSummary::from(&visual),
            api: CheckSummary::from(&api),
            enriched,
            enrichment_failures,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            generated_at: Utc::now(),
            stages: self.stages,
        };

        tracing::info!(
            items = summary.item_count,
            target = summary.target_count,
            visual_pass = summary.visual_pass,
            api_pass = summary.api_pass,
            api_skipped = summary.api.skipped,
            failed_lookups = summary.enrichment_failures.len(),
            "verification done"
        );
        summary
    }
}
