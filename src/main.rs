//! hn-order-verify: binary entrypoint.
//! Collects the Hacker News `newest` listing, checks its order by page age
//! text and by item API timestamps, and writes a report.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hn_order_verify::enrich::hn_api::HnItemApi;
use hn_order_verify::listing::{collect_listing, hn_newest::HnNewestSource};
use hn_order_verify::order::TracingLog;
use hn_order_verify::{report, EnrichmentClient, Verifier, VerifyConfig};

/// Compact logs by default; `HN_VERIFY_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hn_order_verify=info,order_check=info,warn"));

    let json = std::env::var("HN_VERIFY_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run(cfg: VerifyConfig) -> Result<bool> {
    let api = HnItemApi::new(&cfg.api_base_url, cfg.request_timeout())?;
    let enrichment = EnrichmentClient::new(Arc::new(api), cfg.retry_policy())
        .with_max_concurrency(cfg.max_concurrency);
    let verifier = Verifier::new(enrichment, cfg.target_count, Arc::new(TracingLog));

    let source = HnNewestSource::new(&cfg.listing_url, cfg.request_timeout())?;
    let collected = collect_listing(&source, cfg.target_count)
        .await
        .context("collecting listing")?;
    let pages = collected.pages;

    let mut summary = verifier.run(collected.list).await;
    summary.pages_visited = Some(pages);

    report::write_html_report(&summary, &cfg.report_path)?;
    if let Some(path) = cfg.summary_json_path.as_deref() {
        report::write_json_summary(&summary, path)?;
    }

    let verdict = summary.verdict_line();
    if summary.passed() {
        tracing::info!("{verdict}");
    } else {
        tracing::warn!("{verdict}");
    }
    tracing::info!("Total execution time: {:.2} seconds", summary.elapsed_secs);
    Ok(summary.passed())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; harmless when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match VerifyConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = ?e, "failed to load config");
            return ExitCode::from(2);
        }
    };

    match run(cfg).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = ?e, "verification aborted");
            ExitCode::from(2)
        }
    }
}
