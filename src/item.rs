// src/item.rs
//! Canonical news item shared by every source and every pipeline stage.
//!
//! Items are built once by the ingest layer and never mutated afterwards:
//! stages only accept, reject, or reorder them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin class of an item. Closed set: every variant has a quality weight
/// in [`crate::source_weights::SourceWeights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Academic,
    MainstreamMedia,
    Forum,
    Aggregator,
    Social,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Academic,
        SourceKind::MainstreamMedia,
        SourceKind::Forum,
        SourceKind::Aggregator,
        SourceKind::Social,
    ];

    /// Fixed tie-break priority, lower is preferred.
    pub fn priority(self) -> u8 {
        match self {
            SourceKind::Academic => 0,
            SourceKind::MainstreamMedia => 1,
            SourceKind::Forum => 2,
            SourceKind::Aggregator => 3,
            SourceKind::Social => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Academic => "academic",
            SourceKind::MainstreamMedia => "mainstream_media",
            SourceKind::Forum => "forum",
            SourceKind::Aggregator => "aggregator",
            SourceKind::Social => "social",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
    #[default]
    #[serde(rename = "und")]
    Unknown,
}

impl Language {
    /// Lenient tag parsing ("en-US", "zh-CN", "ZH"); anything else is `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Language::English,
            "zh" => Language::Chinese,
            _ => Language::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub url: String,
    pub source: SourceKind,
    /// Display name of the concrete feed ("Hacker News", "TechCrunch").
    pub outlet: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub social_score: u64,
    #[serde(default)]
    pub language: Language,
}

impl NewsItem {
    /// Short stable id for logs: first 6 bytes of SHA-256 over the normalized URL
    /// (title when the URL is empty). Never exposes item text.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let key = crate::dedup::normalize_url(&self.url);
        let mut hasher = Sha256::new();
        if key.is_empty() {
            hasher.update(self.title.as_bytes());
        } else {
            hasher.update(key.as_bytes());
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(url: &str) -> NewsItem {
        NewsItem {
            title: "Claude ships a new model".into(),
            summary: None,
            url: url.into(),
            source: SourceKind::MainstreamMedia,
            outlet: "TechCrunch".into(),
            published_at: Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap(),
            social_score: 0,
            language: Language::English,
        }
    }

    #[test]
    fn fingerprint_ignores_url_cosmetics() {
        let a = item("https://www.example.com/story/");
        let b = item("http://example.com/story");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 12);
    }

    #[test]
    fn priority_follows_declaration_order() {
        let mut kinds = SourceKind::ALL.to_vec();
        kinds.reverse();
        kinds.sort_by_key(|k| k.priority());
        assert_eq!(kinds, SourceKind::ALL.to_vec());
    }

    #[test]
    fn language_tags() {
        let l: Language = serde_json::from_str("\"zh\"").unwrap();
        assert_eq!(l, Language::Chinese);
        assert_eq!(Language::from_tag("en-US"), Language::English);
        assert_eq!(Language::from_tag("ZH_cn"), Language::Chinese);
        assert_eq!(Language::from_tag("fr"), Language::Unknown);
    }
}
