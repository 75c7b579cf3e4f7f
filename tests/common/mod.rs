// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use hn_order_verify::{FetchError, Item, OrderedList, TimestampSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Answers from a fixed table; ids missing from the table always fail.
pub struct TableSource {
    pub table: HashMap<String, i64>,
    pub calls: Mutex<Vec<String>>,
}

impl TableSource {
    pub fn new(pairs: &[(&str, i64)]) -> Self {
        Self {
            table: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl TimestampSource for TableSource {
    async fn lookup(&self, id: &str) -> Result<i64, FetchError> {
        self.calls.lock().unwrap().push(id.to_string());
        self.table.get(id).copied().ok_or(FetchError::Status(503))
    }
    fn name(&self) -> &'static str {
        "table"
    }
}

/// Fails the first `failures` calls, then answers `ts`.
pub struct FlakySource {
    pub failures: usize,
    pub ts: i64,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TimestampSource for FlakySource {
    async fn lookup(&self, _id: &str) -> Result<i64, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match n {
            0 => Err(FetchError::Transport("connection reset".into())),
            n if n < self.failures => Err(FetchError::Malformed("truncated".into())),
            _ => Ok(self.ts),
        }
    }
    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// `(id, age text)` pairs into a list.
pub fn list(rows: &[(&str, &str)]) -> OrderedList {
    rows.iter()
        .map(|(id, age)| Item::new(*id, format!("Story number {id} here"), *age))
        .collect()
}
