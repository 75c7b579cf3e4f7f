use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Url;
use std::time::Duration;

use crate::listing::types::{ListingPage, ListingSource, RawItem};

/// Hacker News `newest` listing, fetched as plain HTML.
pub struct HnNewestSource {
    start: Url,
    client: reqwest::Client,
}

impl HnNewestSource {
    pub fn new(listing_url: &str, timeout: Duration) -> Result<Self> {
        let start = Url::parse(listing_url)
            .with_context(|| format!("invalid listing url {listing_url}"))?;
        let client = reqwest::Client::builder()
            .user_agent("hn-order-verify/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building listing http client")?;
        Ok(Self { start, client })
    }
}

#[async_trait]
impl ListingSource for HnNewestSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage> {
        let url = match cursor {
            Some(c) => Url::parse(c).with_context(|| format!("invalid page cursor {c}"))?,
            None => self.start.clone(),
        };
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        let body = resp.text().await.context("listing page .text()")?;
        parse_listing_page(&body, &url)
    }

    fn name(&self) -> &'static str {
        "hn-newest"
    }
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static listing regex"))
}

fn attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=");
    let start = attrs.find(&needle)? + needle.len();
    let rest = &attrs[start..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}

fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class")
        .map(|c| c.split_whitespace().any(|x| x == class))
        .unwrap_or(false)
}

fn inner_text(fragment: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let stripped = re(&RE_TAGS, r"(?s)<[^>]+>").replace_all(fragment, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Parse one listing page. `page_url` resolves the relative "More" link.
///
/// Each `athing` row yields one item; its title is the first link inside
/// `titleline`, its age the link inside the following `age` span (empty
/// when missing).
pub fn parse_listing_page(html: &str, page_url: &Url) -> Result<ListingPage> {
    static RE_TR: OnceCell<Regex> = OnceCell::new();
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    static RE_AGE: OnceCell<Regex> = OnceCell::new();
    static RE_A: OnceCell<Regex> = OnceCell::new();

    let rows: Vec<(usize, String)> = re(&RE_TR, r"<tr\b([^>]*)>")
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let attrs = c.get(1)?.as_str();
            if !has_class(attrs, "athing") {
                return None;
            }
            attr(attrs, "id").map(|id| (whole.start(), id.to_string()))
        })
        .collect();

    let title_re = re(
        &RE_TITLE,
        r#"(?s)class=["']titleline["'][^>]*>\s*<a\b[^>]*>(.*?)</a>"#,
    );
    let age_re = re(&RE_AGE, r#"(?s)class=["']age["'][^>]*>\s*<a\b[^>]*>(.*?)</a>"#);

    let mut items = Vec::with_capacity(rows.len());
    for (i, (start, id)) in rows.iter().enumerate() {
        let end = rows.get(i + 1).map(|(s, _)| *s).unwrap_or(html.len());
        let segment = &html[*start..end];
        let title = title_re
            .captures(segment)
            .and_then(|c| c.get(1))
            .map(|m| inner_text(m.as_str()))
            .unwrap_or_default();
        let age_text = age_re
            .captures(segment)
            .and_then(|c| c.get(1))
            .map(|m| inner_text(m.as_str()))
            .unwrap_or_default();
        items.push(RawItem {
            id: id.clone(),
            title,
            age_text,
        });
    }

    let mut next = None;
    for c in re(&RE_A, r"<a\b([^>]*)>").captures_iter(html) {
        let attrs = c.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !has_class(attrs, "morelink") {
            continue;
        }
        if let Some(href) = attr(attrs, "href") {
            let href = html_escape::decode_html_entities(href);
            let resolved = page_url
                .join(&href)
                .with_context(|| format!("resolving more link {href}"))?;
            next = Some(resolved.to_string());
        }
        break;
    }

    Ok(ListingPage { items, next })
}
