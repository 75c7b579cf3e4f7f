// src/listing/mod.rs
pub mod hn_newest;
pub mod types;

use crate::listing::types::{Item, ListingSource, OrderedList};
use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("listing_pages_total", "Listing pages fetched.");
        describe_counter!(
            "listing_duplicates_total",
            "Listing rows dropped because their id was already collected."
        );
    });
}

/// Result of paging through a listing.
#[derive(Debug, Clone)]
pub struct Collected {
    pub list: OrderedList,
    pub pages: usize,
    pub target: usize,
}

impl Collected {
    pub fn is_short(&self) -> bool {
        self.list.len() < self.target
    }
}

/// Page through `source` until `target` items are collected or the listing
/// runs out. Items keep the order they were displayed in; a repeated id is
/// dropped. Any page error aborts the collection.
pub async fn collect_listing(source: &dyn ListingSource, target: usize) -> Result<Collected> {
    ensure_metrics_described();

    let mut seen: HashSet<String> = HashSet::new();
    let mut items: Vec<Item> = Vec::with_capacity(target);
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    while items.len() < target {
        pages += 1;
        tracing::info!(source = source.name(), page = pages, "fetching listing page");
        let page = source
            .fetch_page(cursor.as_deref())
            .await
            .with_context(|| format!("fetching page {pages} from {}", source.name()))?;
        counter!("listing_pages_total").increment(1);

        let before = items.len();
        for raw in page.items {
            if !seen.insert(raw.id.clone()) {
                tracing::warn!(id = %raw.id, page = pages, "duplicate listing id dropped");
                counter!("listing_duplicates_total").increment(1);
                continue;
            }
            items.push(Item::from(raw));
        }

        // A page with nothing new would loop forever on a stuck cursor.
        if items.len() == before {
            tracing::warn!(page = pages, "listing page added no new items, stopping");
            break;
        }

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    items.truncate(target);
    if items.len() < target {
        tracing::warn!(
            collected = items.len(),
            target,
            "listing ended before the target count was reached"
        );
    }

    Ok(Collected {
        list: OrderedList::new(items),
        pages,
        target,
    })
}
