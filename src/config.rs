// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::enrich::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "HN_VERIFY_CONFIG";
pub const DEFAULT_TOML_PATH: &str = "config/verify.toml";
pub const DEFAULT_JSON_PATH: &str = "config/verify.json";

fn default_target_count() -> usize {
    100
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_backoff_multiplier() -> u32 {
    2
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_listing_url() -> String {
    "https://news.ycombinator.com/newest".to_string()
}
fn default_api_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}
fn default_report_path() -> PathBuf {
    PathBuf::from("report.html")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyConfig {
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
    /// `None` = every lookup in flight at once.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default)]
    pub summary_json_path: Option<PathBuf>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_concurrency: None,
            request_timeout_secs: default_request_timeout_secs(),
            listing_url: default_listing_url(),
            api_base_url: default_api_base_url(),
            report_path: default_report_path(),
            summary_json_path: None,
        }
    }
}

impl VerifyConfig {
    /// Load from an explicit path. TOML or JSON, picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $HN_VERIFY_CONFIG
    /// 2) config/verify.toml
    /// 3) config/verify.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides().sanitized())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("HN_VERIFY_TARGET") {
            self.target_count = v;
        }
        if let Some(v) = env_parse("HN_VERIFY_RETRIES") {
            self.retry_attempts = v;
        }
        if let Some(v) = env_parse("HN_VERIFY_BASE_DELAY_MS") {
            self.base_delay_ms = v;
        }
        if let Some(v) = env_parse("HN_VERIFY_MAX_CONCURRENCY") {
            self.max_concurrency = Some(v);
        }
        self
    }

    fn sanitized(mut self) -> Self {
        self.retry_attempts = self.retry_attempts.max(1);
        self.backoff_multiplier = self.backoff_multiplier.max(1);
        self.max_concurrency = self.max_concurrency.filter(|n| *n > 0);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.backoff_multiplier,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<VerifyConfig> {
    if hint_ext == "json" {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
        return toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"));
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported config format: {toml_err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_takes_defaults() {
        let cfg = parse_config("target_count = 30\nmax_concurrency = 8\n", "toml").unwrap();
        assert_eq!(cfg.target_count, 30);
        assert_eq!(cfg.max_concurrency, Some(8));
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.base_delay_ms, 1000);
        assert_eq!(cfg.report_path, PathBuf::from("report.html"));
    }

    #[test]
    fn json_works_without_extension_hint() {
        let cfg = parse_config(r#"{"retry_attempts": 5}"#, "").unwrap();
        assert_eq!(cfg.retry_attempts, 5);
    }

    #[test]
    fn sanitize_clamps_zeroes() {
        let cfg = VerifyConfig {
            retry_attempts: 0,
            backoff_multiplier: 0,
            max_concurrency: Some(0),
            ..VerifyConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.retry_attempts, 1);
        assert_eq!(cfg.backoff_multiplier, 1);
        assert_eq!(cfg.max_concurrency, None);
    }

    #[test]
    fn retry_policy_mirrors_fields() {
        let p = VerifyConfig::default().retry_policy();
        assert_eq!(p, RetryPolicy::default());
    }
}
