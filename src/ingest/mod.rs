// src/ingest/mod.rs
//! Source fan-out and item normalization.
//!
//! Providers run concurrently (bounded by a semaphore, each under its own
//! timeout). Their raw items are validated into [`NewsItem`]s and concatenated
//! in provider order, whatever order the fetches complete in.

pub mod providers;
pub mod types;

use crate::config::FetchConfig;
use crate::item::NewsItem;
use crate::relevance::is_readable;
use crate::ingest::types::{RawItem, SourceProvider};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const TITLE_MAX_CHARS: usize = 300;
pub const SUMMARY_MAX_CHARS: usize = 500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw items returned by providers.");
        describe_counter!(
            "ingest_kept_total",
            "Items that passed validation and normalization."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Malformed items dropped at ingestion."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Providers that failed a run: fetch/parse errors, timeouts and panics."
        );
        describe_counter!(
            "ingest_hn_item_errors_total",
            "Hacker News story details that could not be fetched or decoded."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when ingest last ran.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (block content of script/style first)
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS
        .get_or_init(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").expect("regex"));
    out = re_blocks.replace_all(&out, " ").to_string();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").expect("regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Parse a source timestamp: RFC 3339, RFC 2822, or unix seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }
    let parsed = OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc2822))
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()));
    // Feeds in the wild use named zones ("GMT", "EST") that only chrono's
    // lenient RFC 2822 parser accepts.
    parsed.or_else(|| {
        DateTime::parse_from_rfc2822(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Why an item never made it into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    EmptyTitle,
    BadTimestamp,
    Unreadable,
}

/// Validate one raw item. A missing timestamp becomes `fetched_at`; a future
/// one is clamped to it.
pub fn normalize_item(raw: RawItem, fetched_at: DateTime<Utc>) -> Result<NewsItem, DropReason> {
    let title = normalize_text(&raw.title, TITLE_MAX_CHARS);
    if title.is_empty() {
        return Err(DropReason::EmptyTitle);
    }
    let summary = raw
        .summary
        .as_deref()
        .map(|s| normalize_text(s, SUMMARY_MAX_CHARS))
        .filter(|s| !s.is_empty());
    if !is_readable(&title) || !summary.as_deref().map_or(true, is_readable) {
        return Err(DropReason::Unreadable);
    }

    let published_at = match raw.published.as_deref().map(str::trim) {
        None | Some("") => fetched_at,
        Some(ts) => parse_timestamp(ts).ok_or(DropReason::BadTimestamp)?,
    };

    Ok(NewsItem {
        title,
        summary,
        url: raw.url.trim().to_string(),
        source: raw.source,
        outlet: raw.outlet,
        published_at: published_at.min(fetched_at),
        social_score: raw.social_score.unwrap_or(0),
        language: raw.language,
    })
}

/// Validate a batch, preserving order. Returns the kept items and the drop count.
pub fn normalize_items(raw: Vec<RawItem>, fetched_at: DateTime<Utc>) -> (Vec<NewsItem>, usize) {
    let mut kept = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for r in raw {
        let outlet = r.outlet.clone();
        match normalize_item(r, fetched_at) {
            Ok(item) => kept.push(item),
            Err(reason) => {
                dropped += 1;
                tracing::debug!(target: "ingest", outlet = %outlet, ?reason, "malformed item dropped");
            }
        }
    }
    (kept, dropped)
}

/// What a single provider contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOutcome {
    pub name: String,
    pub fetched: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Valid items, concatenated in provider order.
    pub items: Vec<NewsItem>,
    pub providers: Vec<ProviderOutcome>,
    pub dropped: usize,
}

impl IngestReport {
    pub fn failed_providers(&self) -> usize {
        self.providers.iter().filter(|p| p.error.is_some()).count()
    }
}

/// Fetch from every provider and normalize the result.
///
/// A provider that errors, times out or panics contributes zero items; the
/// run itself never fails.
pub async fn collect(
    providers: &[Arc<dyn SourceProvider>],
    cfg: &FetchConfig,
    fetched_at: DateTime<Utc>,
) -> IngestReport {
    ensure_metrics_described();

    let sem = Arc::new(Semaphore::new(cfg.max_concurrency.max(1)));
    let per_call = Duration::from_secs(cfg.timeout_secs);
    let mut set = JoinSet::new();
    let mut slot_of = HashMap::new();

    for (idx, provider) in providers.iter().enumerate() {
        let provider = Arc::clone(provider);
        let sem = Arc::clone(&sem);
        let handle = set.spawn(async move {
            let _permit = sem.acquire_owned().await;
            let t0 = std::time::Instant::now();
            let res = tokio::time::timeout(per_call, provider.fetch_latest()).await;
            histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            let res = match res {
                Ok(inner) => inner.map_err(|e| format!("{e:#}")),
                Err(_) => Err(format!("timed out after {}s", per_call.as_secs())),
            };
            (idx, res)
        });
        slot_of.insert(handle.id(), idx);
    }

    let mut slots: Vec<Result<Vec<RawItem>, String>> = providers
        .iter()
        .map(|_| Err("not joined".to_string()))
        .collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, res)) => slots[idx] = res,
            Err(e) => {
                if let Some(&idx) = slot_of.get(&e.id()) {
                    slots[idx] = Err(format!("provider task failed: {e}"));
                }
            }
        }
    }

    let mut raw_all = Vec::new();
    let mut outcomes = Vec::with_capacity(providers.len());
    for (provider, slot) in providers.iter().zip(slots) {
        match slot {
            Ok(mut items) => {
                items.truncate(cfg.max_items_per_source);
                counter!("ingest_items_total").increment(items.len() as u64);
                outcomes.push(ProviderOutcome {
                    name: provider.name().to_string(),
                    fetched: items.len(),
                    error: None,
                });
                raw_all.append(&mut items);
            }
            Err(error) => {
                tracing::warn!(target: "ingest", provider = provider.name(), %error, "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                outcomes.push(ProviderOutcome {
                    name: provider.name().to_string(),
                    fetched: 0,
                    error: Some(error),
                });
            }
        }
    }

    let (items, dropped) = normalize_items(raw_all, fetched_at);

    // Telemetry
    counter!("ingest_kept_total").increment(items.len() as u64);
    counter!("ingest_dropped_total").increment(dropped as u64);
    gauge!("ingest_last_run_ts").set(fetched_at.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        providers = providers.len(),
        failed = outcomes.iter().filter(|o| o.error.is_some()).count(),
        kept = items.len(),
        dropped,
        "ingest done"
    );

    IngestReport {
        items,
        providers: outcomes,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Language, SourceKind};
    use chrono::TimeZone;

    fn raw(title: &str, published: Option<&str>) -> RawItem {
        RawItem {
            title: title.into(),
            summary: None,
            url: "https://example.test/a".into(),
            outlet: "Example".into(),
            source: SourceKind::MainstreamMedia,
            published: published.map(Into::into),
            social_score: None,
            language: Language::English,
        }
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn normalize_text_strips_tags_and_ws() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b></p><script>x()</script>  ";
        assert_eq!(normalize_text(s, 100), "Hello, world");
        assert_eq!(normalize_text("“quoted”", 100), "\"quoted\"");
        assert_eq!(normalize_text("abcdef", 3), "abc");
    }

    #[test]
    fn timestamps_in_all_supported_shapes() {
        let want = Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-09-06T10:00:00Z"), Some(want));
        assert_eq!(parse_timestamp("2025-09-06T12:00:00+02:00"), Some(want));
        assert_eq!(parse_timestamp("Sat, 06 Sep 2025 10:00:00 +0000"), Some(want));
        assert_eq!(parse_timestamp("Sat, 06 Sep 2025 10:00:00 GMT"), Some(want));
        assert_eq!(parse_timestamp(&want.timestamp().to_string()), Some(want));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn malformed_items_dropped_and_clock_rules_applied() {
        let (items, dropped) = normalize_items(
            vec![
                raw("   ", None),
                raw("<br/>", None),
                raw("Bad date", Some("not a date")),
                raw("No date", None),
                raw("From the future", Some("2030-01-01T00:00:00Z")),
                raw("Broken \u{FFFD} text", None),
            ],
            fetched_at(),
        );
        assert_eq!(dropped, 4);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "No date");
        assert_eq!(items[0].published_at, fetched_at());
        assert_eq!(items[1].published_at, fetched_at());
    }
}
