// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod age;
pub mod config;
pub mod enrich;
pub mod listing;
pub mod order;
pub mod report;
pub mod verify;

// ---- Re-exports for stable public API ----
pub use crate::config::VerifyConfig;
pub use crate::enrich::types::{FetchError, TimestampSource};
pub use crate::enrich::{EnrichmentClient, RetryPolicy};
pub use crate::listing::types::{Item, ListingSource, OrderedList};
pub use crate::order::{CheckLog, OrderCheck, PairClass, Polarity};
pub use crate::verify::{Verifier, VerificationSummary};
