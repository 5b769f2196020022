// src/dedup.rs
//! Near-duplicate suppression.
//!
//! Online, single pass, order dependent:
//! - Items are visited in input order.
//! - An item whose normalized URL was already seen joins that cluster, whatever its title.
//! - Otherwise its title is compared against the accepted representatives only
//!   (in acceptance order); the first one with similarity >= threshold absorbs it.
//! - Otherwise it becomes a new representative.
//!
//! The first-seen item anchors its cluster and is the one that survives. There is
//! no transitive merging: with A~B and B~C but not A~C, input [A, B, C] yields
//! clusters {A, B} and {C}.
//!
//! Similarity: `strsim::normalized_levenshtein` over normalized titles
//! (`1 - distance / max_len`, in chars).

use crate::item::NewsItem;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;
use strsim::normalized_levenshtein;
use tracing::debug;

/// Titles shorter than this (after normalization) never match anything.
pub const MIN_COMPARABLE_CHARS: usize = 4;

/// Absorbs float noise so a similarity that equals the threshold on paper
/// also passes in f64. Far below one edit on any realistic title.
const SIMILARITY_EPSILON: f64 = 1e-9;

/// A representative and the items folded into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub representative: NewsItem,
    /// Items in the cluster, representative included.
    pub members: usize,
    /// Sum of `social_score` over all members.
    pub social_total: u64,
}

impl Cluster {
    pub fn single(item: NewsItem) -> Self {
        Self {
            social_total: item.social_score,
            representative: item,
            members: 1,
        }
    }

    fn absorb(&mut self, item: &NewsItem) {
        self.members += 1;
        self.social_total = self.social_total.saturating_add(item.social_score);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    threshold: f64,
    compare_summaries: bool,
}

/// Precomputed comparison keys of one representative.
struct RepKeys {
    title: String,
    summary: Option<String>,
}

impl Deduplicator {
    /// `threshold` is expected in (0, 1]; the pipeline validates it up front.
    pub fn new(threshold: f64, compare_summaries: bool) -> Self {
        Self {
            threshold,
            compare_summaries,
        }
    }

    /// Collapse near-duplicates into clusters, preserving first-seen order.
    pub fn cluster(&self, items: Vec<NewsItem>) -> Vec<Cluster> {
        let before = items.len();
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut keys: Vec<RepKeys> = Vec::new();
        let mut by_url: HashMap<String, usize> = HashMap::new();
        let mut url_merges = 0usize;
        let mut fuzzy_merges = 0usize;

        for item in items {
            let url_key = normalize_url(&item.url);

            // 1) Exact URL short-circuit.
            if !url_key.is_empty() {
                if let Some(&idx) = by_url.get(&url_key) {
                    clusters[idx].absorb(&item);
                    url_merges += 1;
                    continue;
                }
            }

            // 2) Fuzzy title check against representatives.
            let title_key = normalize_title(&item.title);
            let summary_key = self.summary_key(&item);
            let hit = keys.iter().position(|rep| {
                self.similarity_to(rep, &title_key, summary_key.as_deref()) + SIMILARITY_EPSILON
                    >= self.threshold
            });

            match hit {
                Some(idx) => {
                    debug!(
                        target: "dedup",
                        merged = %item.fingerprint(),
                        into = %clusters[idx].representative.fingerprint(),
                        "near-duplicate"
                    );
                    clusters[idx].absorb(&item);
                    if !url_key.is_empty() {
                        by_url.insert(url_key, idx);
                    }
                    fuzzy_merges += 1;
                }
                None => {
                    let idx = clusters.len();
                    if !url_key.is_empty() {
                        by_url.insert(url_key, idx);
                    }
                    keys.push(RepKeys {
                        title: title_key,
                        summary: summary_key,
                    });
                    clusters.push(Cluster::single(item));
                }
            }
        }

        debug!(
            target: "dedup",
            before,
            after = clusters.len(),
            url_merges,
            fuzzy_merges,
            "dedup done"
        );
        clusters
    }

    /// Representatives only.
    pub fn dedup(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        self.cluster(items)
            .into_iter()
            .map(|c| c.representative)
            .collect()
    }

    fn summary_key(&self, item: &NewsItem) -> Option<String> {
        if !self.compare_summaries {
            return None;
        }
        item.summary
            .as_deref()
            .map(normalize_title)
            .filter(|s| s.chars().count() >= MIN_COMPARABLE_CHARS)
    }

    fn similarity_to(&self, rep: &RepKeys, title: &str, summary: Option<&str>) -> f64 {
        let t = title_similarity(&rep.title, title);
        match (rep.summary.as_deref(), summary) {
            (Some(a), Some(b)) => t.max(title_similarity(a, b)),
            _ => t,
        }
    }
}

/// Similarity of two already-normalized strings in [0, 1]. Near-empty input is
/// maximally dissimilar, even against itself.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.chars().count() < MIN_COMPARABLE_CHARS || b.chars().count() < MIN_COMPARABLE_CHARS {
        return 0.0;
    }
    normalized_levenshtein(a, b)
}

/// Lowercase, turn punctuation into spaces (word chars and CJK kept), collapse spaces.
pub fn normalize_title(title: &str) -> String {
    static RE_PUNCT: OnceCell<Regex> = OnceCell::new();
    let re = RE_PUNCT.get_or_init(|| {
        Regex::new(r"[^\w\s\p{Han}]").expect("punctuation regex")
    });
    let lowered = title.to_lowercase();
    let spaced = re.replace_all(&lowered, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// URL comparison key: no scheme, no leading `www.`, no trailing `/`, lowercase.
pub fn normalize_url(url: &str) -> String {
    let mut s = url.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
            break;
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    s.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Language, SourceKind};
    use chrono::Utc;

    fn item(title: &str, url: &str, social: u64) -> NewsItem {
        NewsItem {
            title: title.into(),
            summary: None,
            url: url.into(),
            source: SourceKind::MainstreamMedia,
            outlet: "TechCrunch".into(),
            published_at: Utc::now(),
            social_score: social,
            language: Language::English,
        }
    }

    #[test]
    fn url_normalization() {
        assert_eq!(normalize_url("HTTPS://www.Example.com/a/"), "example.com/a");
        assert_eq!(normalize_url("http://example.com/a"), "example.com/a");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn title_normalization_strips_punctuation() {
        assert_eq!(
            normalize_title("  OpenAI's GPT-5: Out NOW!  "),
            "openai s gpt 5 out now"
        );
        assert_eq!(normalize_title("大模型，发布！"), "大模型 发布");
    }

    #[test]
    fn identical_titles_merge_and_first_seen_survives() {
        let d = Deduplicator::new(0.8, false);
        let out = d.cluster(vec![
            item("OpenAI releases GPT-5", "https://a.test/1", 3),
            item("OpenAI releases GPT-5!", "https://b.test/2", 500),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].representative.url, "https://a.test/1");
        assert_eq!(out[0].members, 2);
        assert_eq!(out[0].social_total, 503);
    }

    #[test]
    fn same_url_merges_even_with_different_titles() {
        let d = Deduplicator::new(0.8, false);
        let out = d.dedup(vec![
            item("Anthropic raises a new round", "https://www.news.test/x/", 0),
            item("Completely unrelated headline", "http://news.test/x", 0),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Anthropic raises a new round");
    }

    #[test]
    fn member_url_is_remembered() {
        let d = Deduplicator::new(0.8, false);
        let out = d.cluster(vec![
            item("Gemini 3 launches today", "https://a.test/1", 1),
            item("Gemini 3 launches today!", "https://b.test/2", 1),
            item("Something else entirely", "https://b.test/2", 1),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].members, 3);
    }

    #[test]
    fn empty_urls_never_short_circuit() {
        let d = Deduplicator::new(0.8, false);
        let out = d.dedup(vec![
            item("Claude learns to code", "", 0),
            item("Weather in Prague", "", 0),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn near_empty_titles_are_not_merged() {
        let d = Deduplicator::new(0.5, false);
        let out = d.dedup(vec![
            item("AI", "https://a.test/1", 0),
            item("AI", "https://a.test/2", 0),
            item("?!", "https://a.test/3", 0),
        ]);
        assert_eq!(out.len(), 3);
        assert_eq!(title_similarity("", ""), 0.0);
    }

    #[test]
    fn no_transitive_merge() {
        // A~B and B~C, but A and C are 4 edits apart.
        let a = "aaaa bbbb";
        let b = "aaaa bbcc";
        let c = "aaaa cccc";
        assert!(title_similarity(a, b) >= 0.75);
        assert!(title_similarity(b, c) >= 0.75);
        assert!(title_similarity(a, c) < 0.75);

        let d = Deduplicator::new(0.75, false);
        let out = d.dedup(vec![
            item(a, "https://t.test/a", 0),
            item(b, "https://t.test/b", 0),
            item(c, "https://t.test/c", 0),
        ]);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec![a, c]);
    }

    #[test]
    fn summaries_compared_only_when_enabled() {
        let mut x = item("Lab unveils model", "https://s.test/1", 0);
        x.summary = Some("The new multimodal model tops every leaderboard".into());
        let mut y = item("Benchmarks shaken up", "https://s.test/2", 0);
        y.summary = Some("The new multimodal model tops every leaderboard!".into());

        let off = Deduplicator::new(0.8, false);
        assert_eq!(off.dedup(vec![x.clone(), y.clone()]).len(), 2);
        let on = Deduplicator::new(0.8, true);
        assert_eq!(on.dedup(vec![x, y]).len(), 1);
    }
}
