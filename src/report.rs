//! Report emitter: renders a `VerificationSummary` as HTML or JSON.

use anyhow::{Context, Result};
use html_escape::encode_text;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::verify::{CheckSummary, VerificationSummary};

const STYLE: &str = r#"
      body { font-family: Arial, sans-serif; margin: 20px; }
      h1 { text-align: center; }
      p { font-size: 16px; }
      .result { font-weight: bold; }
      .pass { color: green; }
      .fail { color: red; }
      pre { background: #f6f6f6; padding: 8px; white-space: pre-wrap; }
"#;

fn yes_no(pass: bool) -> (&'static str, &'static str) {
    if pass {
        ("Yes", "pass")
    } else {
        ("No", "fail")
    }
}

fn check_section(out: &mut String, title: &str, check: &CheckSummary) {
    let _ = writeln!(out, "    <h2>{}</h2>", encode_text(title));
    let _ = writeln!(
        out,
        "    <p>Compared pairs: {}, ties: {}, inverted: {}, skipped: {}</p>",
        check.compared, check.ties, check.inverted, check.skipped
    );
    out.push_str("    <pre>");
    for line in &check.lines {
        out.push_str(&encode_text(line));
        out.push('\n');
    }
    out.push_str("</pre>\n");
}

/// Self-contained HTML page for one run.
pub fn render_html(summary: &VerificationSummary) -> String {
    let (visual_word, visual_class) = yes_no(summary.visual_pass);
    let (api_word, api_class) = if summary.api_pass && !summary.api_verified() {
        ("Unverified", "fail")
    } else {
        yes_no(summary.api_pass)
    };
    let (overall_word, overall_class) = yes_no(summary.passed());

    let mut out = String::with_capacity(4096);
    out.push_str("<html>\n  <head>\n    <title>Hacker News Article Order Test Report</title>\n");
    let _ = writeln!(out, "    <style>{STYLE}    </style>\n  </head>\n  <body>");
    let _ = writeln!(
        out,
        "    <h1>Hacker News Article Order Test Report (First {} Articles)</h1>",
        summary.target_count
    );
    let _ = writeln!(
        out,
        "    <p>Number of Articles Checked: {} of {}</p>",
        summary.item_count, summary.target_count
    );
    if let Some(pages) = summary.pages_visited {
        let _ = writeln!(out, "    <p>Listing Pages Visited: {pages}</p>");
    }
    let _ = writeln!(
        out,
        "    <p>Visual Check Passed: <span class=\"result {visual_class}\">{visual_word}</span></p>"
    );
    let _ = writeln!(
        out,
        "    <p>API Check Passed: <span class=\"result {api_class}\">{api_word}</span></p>"
    );
    let _ = writeln!(
        out,
        "    <p>Overall: <span class=\"result {overall_class}\">{overall_word}</span> ({})</p>",
        encode_text(&summary.verdict_line())
    );
    let _ = writeln!(
        out,
        "    <p>Total Execution Time: {:.2} seconds</p>",
        summary.elapsed_secs
    );
    let _ = writeln!(
        out,
        "    <p>Generated At: {}</p>",
        summary.generated_at.to_rfc3339()
    );

    let _ = writeln!(
        out,
        "    <h2>Timestamp Lookups</h2>\n    <p>Enriched: {}, failed: {}</p>",
        summary.enriched,
        summary.enrichment_failures.len()
    );
    if !summary.enrichment_failures.is_empty() {
        out.push_str("    <ul>\n");
        for f in &summary.enrichment_failures {
            let _ = writeln!(
                out,
                "      <li>{}: {}</li>",
                encode_text(&f.id),
                encode_text(&f.reason)
            );
        }
        out.push_str("    </ul>\n");
    }

    check_section(&mut out, "Visual Check", &summary.visual);
    check_section(&mut out, "API Check", &summary.api);

    out.push_str("  </body>\n</html>\n");
    out
}

pub fn write_html_report(summary: &VerificationSummary, path: &Path) -> Result<()> {
    fs::write(path, render_html(summary))
        .with_context(|| format!("writing html report to {}", path.display()))?;
    tracing::info!(path = %path.display(), "report saved");
    Ok(())
}

pub fn write_json_summary(summary: &VerificationSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("serializing summary")?;
    fs::write(path, json)
        .with_context(|| format!("writing summary json to {}", path.display()))?;
    tracing::info!(path = %path.display(), "summary json saved");
    Ok(())
}
