// src/listing/types.rs
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;

/// One entry as scraped from a listing page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub age_text: String, // e.g. "3 hours ago"
}

/// One page of a listing plus the cursor for the next page (if any).
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<RawItem>,
    pub next: Option<String>,
}

#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// `cursor` is `None` for the first page, then whatever the previous page returned.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage>;
    fn name(&self) -> &'static str;
}

/// A listing entry inside a verification run.
///
/// `relative_age_text` is captured once at collection time. The
/// authoritative timestamp starts empty and is written at most once.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Item {
    id: String,
    title: String,
    relative_age_text: String,
    authoritative_timestamp: Option<i64>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, age: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            relative_age_text: age.into(),
            authoritative_timestamp: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn relative_age_text(&self) -> &str {
        &self.relative_age_text
    }

    /// Unix seconds from the item API, once enrichment has succeeded.
    pub fn authoritative_timestamp(&self) -> Option<i64> {
        self.authoritative_timestamp
    }

    /// First three words of the title, quoted, for log lines.
    pub fn excerpt(&self) -> String {
        let words: Vec<&str> = self.title.split_whitespace().take(3).collect();
        format!("\"{}...\"", words.join(" "))
    }

    /// Returns false (and leaves the value alone) if a timestamp was already set.
    fn set_timestamp(&mut self, ts: i64) -> bool {
        if self.authoritative_timestamp.is_some() {
            return false;
        }
        self.authoritative_timestamp = Some(ts);
        true
    }
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        Item::new(raw.id, raw.title, raw.age_text)
    }
}

/// Items in listing (visual) order. The order never changes after collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderedList {
    items: Vec<Item>,
}

impl OrderedList {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Write timestamps keyed by id. Positions are untouched; ids not in the
    /// list are ignored. Returns how many items received a timestamp.
    pub fn apply_timestamps(&mut self, by_id: &HashMap<String, i64>) -> usize {
        let mut written = 0usize;
        for item in self.items.iter_mut() {
            if let Some(ts) = by_id.get(item.id()) {
                if item.set_timestamp(*ts) {
                    written += 1;
                }
            }
        }
        written
    }
}

impl FromIterator<Item> for OrderedList {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
