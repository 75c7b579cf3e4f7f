//! # Order Validator
//! Walks adjacent pairs of a listing and classifies each one as newer-first,
//! tie, inverted, or skipped (a key is missing on either side).
//!
//! The same routine serves both checks. `Polarity` says which way the key
//! grows with age: relative age in minutes grows as an entry gets older,
//! a unix timestamp shrinks.

use metrics::counter;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Mutex;

/// Direction in which a key moves as an entry gets older.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Larger key = older (relative age).
    AscendingIsOlder,
    /// Larger key = newer (absolute timestamp).
    DescendingIsOlder,
}

/// Describes one kind of check: its log label, the key unit and polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderCheck {
    pub label: &'static str,
    pub unit: &'static str,
    pub polarity: Polarity,
}

impl OrderCheck {
    /// Page age text normalized to minutes.
    pub const VISUAL: OrderCheck = OrderCheck {
        label: "VISUAL",
        unit: "minutes",
        polarity: Polarity::AscendingIsOlder,
    };

    /// Item API `time` in unix seconds.
    pub const API: OrderCheck = OrderCheck {
        label: "API",
        unit: "seconds",
        polarity: Polarity::DescendingIsOlder,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairClass {
    NewerFirst,
    Tie,
    Inverted,
    Skipped,
}

/// One adjacent pair `(index, index + 1)`.
#[derive(Debug, Clone, Serialize)]
pub struct PairResult<K> {
    pub index: usize,
    pub first_id: String,
    pub second_id: String,
    pub class: PairClass,
    /// How much older the first entry is than the second, in key units.
    /// Negative for newer-first, `None` for skipped pairs.
    pub older_by: Option<K>,
    pub line: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderReport<K> {
    pub check: OrderCheck,
    pub all_in_order: bool,
    pub pairs: Vec<PairResult<K>>,
}

impl<K> OrderReport<K> {
    fn count(&self, class: PairClass) -> usize {
        self.pairs.iter().filter(|p| p.class == class).count()
    }

    pub fn inverted(&self) -> usize {
        self.count(PairClass::Inverted)
    }

    pub fn ties(&self) -> usize {
        self.count(PairClass::Tie)
    }

    pub fn skipped(&self) -> usize {
        self.count(PairClass::Skipped)
    }

    /// Pairs that were actually compared (not skipped).
    pub fn compared(&self) -> usize {
        self.pairs.len() - self.skipped()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.line.as_str())
    }
}

/// Receives the human-readable narration of a check.
pub trait CheckLog: Send + Sync {
    fn line(&self, line: &str);
}

/// Emits each line through `tracing` (target `order_check`).
pub struct TracingLog;

impl CheckLog for TracingLog {
    fn line(&self, line: &str) {
        tracing::info!(target: "order_check", "{line}");
    }
}

/// Drops everything.
pub struct NullLog;

impl CheckLog for NullLog {
    fn line(&self, _line: &str) {}
}

/// Keeps lines in memory.
#[derive(Default)]
pub struct MemoryLog {
    pub lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().expect("memory log mutex poisoned").clone()
    }
}

impl CheckLog for MemoryLog {
    fn line(&self, line: &str) {
        self.lines
            .lock()
            .expect("memory log mutex poisoned")
            .push(line.to_string());
    }
}

/// Difference between two keys that never panics on extreme values.
pub trait KeyDiff: Copy {
    fn diff(self, rhs: Self) -> Self;
}

impl KeyDiff for i64 {
    fn diff(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl KeyDiff for f64 {
    fn diff(self, rhs: Self) -> Self {
        self - rhs
    }
}

/// Anything a pair needs to be described in a log line.
pub trait Labeled {
    fn id(&self) -> &str;
    fn excerpt(&self) -> String;
}

impl Labeled for crate::listing::types::Item {
    fn id(&self) -> &str {
        crate::listing::types::Item::id(self)
    }
    fn excerpt(&self) -> String {
        crate::listing::types::Item::excerpt(self)
    }
}

/// Compare every adjacent pair of `seq` using `key_of`.
///
/// `all_in_order` is false iff at least one compared pair is inverted.
/// Pairs with a missing key are recorded as skipped and ignored by the
/// verdict; a sequence where every pair is skipped is vacuously in order,
/// so callers should look at `compared()` as well.
pub fn validate<T, K, F>(
    seq: &[T],
    key_of: F,
    check: OrderCheck,
    log: &dyn CheckLog,
) -> OrderReport<K>
where
    T: Labeled,
    K: KeyDiff + Default + PartialOrd + Display,
    F: Fn(&T) -> Option<K>,
{
    log.line(&format!("Checking {} order:", check.label.to_ascii_lowercase()));

    let mut pairs = Vec::with_capacity(seq.len().saturating_sub(1));
    let mut all_in_order = true;

    for (index, w) in seq.windows(2).enumerate() {
        let (a, b) = (&w[0], &w[1]);
        let n = index + 1;

        let (class, older_by, line) = match (key_of(a), key_of(b)) {
            (Some(ka), Some(kb)) => {
                let older_by = match check.polarity {
                    Polarity::AscendingIsOlder => ka.diff(kb),
                    Polarity::DescendingIsOlder => kb.diff(ka),
                };
                let zero = K::default();
                if older_by < zero {
                    let line = format!(
                        "{} CHECK #{n}: {} was posted {} {} after {}",
                        check.label,
                        a.excerpt(),
                        zero.diff(older_by),
                        check.unit,
                        b.excerpt()
                    );
                    (PairClass::NewerFirst, Some(older_by), line)
                } else if older_by > zero {
                    all_in_order = false;
                    let line = format!(
                        "{} CHECK FAILURE #{n}: {} is {} {} older than {}",
                        check.label,
                        a.excerpt(),
                        older_by,
                        check.unit,
                        b.excerpt()
                    );
                    (PairClass::Inverted, Some(older_by), line)
                } else {
                    let line = format!(
                        "{} CHECK #{n}: {} was posted at the same time as {}",
                        check.label,
                        a.excerpt(),
                        b.excerpt()
                    );
                    (PairClass::Tie, Some(older_by), line)
                }
            }
            _ => {
                let line = format!(
                    "{} CHECK #{n}: skipping comparison with missing data: {}, {}",
                    check.label,
                    a.id(),
                    b.id()
                );
                (PairClass::Skipped, None, line)
            }
        };

        counter!(
            "order_pairs_total",
            "check" => check.label,
            "class" => class_label(class)
        )
        .increment(1);
        log.line(&line);
        pairs.push(PairResult {
            index,
            first_id: a.id().to_string(),
            second_id: b.id().to_string(),
            class,
            older_by,
            line,
        });
    }

    let report = OrderReport {
        check,
        all_in_order,
        pairs,
    };
    if report.all_in_order {
        log.line(&format!(
            "All compared pairs are in order by {} ({} compared, {} skipped).",
            check.label.to_ascii_lowercase(),
            report.compared(),
            report.skipped()
        ));
    } else {
        log.line(&format!(
            "{} pair(s) out of order by {} ({} compared, {} skipped).",
            report.inverted(),
            check.label.to_ascii_lowercase(),
            report.compared(),
            report.skipped()
        ));
    }
    report
}

fn class_label(class: PairClass) -> &'static str {
    match class {
        PairClass::NewerFirst => "newer_first",
        PairClass::Tie => "tie",
        PairClass::Inverted => "inverted",
        PairClass::Skipped => "skipped",
    }
}
