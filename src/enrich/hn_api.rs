use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::enrich::types::{FetchError, TimestampSource};

#[derive(Debug, Deserialize)]
struct ItemBody {
    time: Option<i64>,
}

/// Hacker News Firebase item API (`{base}/item/{id}.json`).
pub struct HnItemApi {
    base: String,
    client: reqwest::Client,
}

impl HnItemApi {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("hn-order-verify/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building item api http client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/item/{}.json", self.base, id)
    }
}

/// Pull `time` out of an item body. The API answers `null` for unknown ids.
pub fn parse_item_body(body: &str) -> Result<i64, FetchError> {
    let parsed: Option<ItemBody> =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    match parsed {
        None => Err(FetchError::NotFound),
        Some(ItemBody { time: Some(t) }) if t > 0 => Ok(t),
        Some(ItemBody { time: Some(t) }) => {
            Err(FetchError::Malformed(format!("non-positive `time` {t}")))
        }
        Some(ItemBody { time: None }) => Err(FetchError::Malformed("missing `time`".into())),
    }
}

#[async_trait]
impl TimestampSource for HnItemApi {
    async fn lookup(&self, id: &str) -> Result<i64, FetchError> {
        let resp = self
            .client
            .get(self.item_url(id))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_item_body(&body)
    }

    fn name(&self) -> &'static str {
        "hn-item-api"
    }
}
