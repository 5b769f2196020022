// src/relevance.rs
//! Relevance gate: keeps items whose title or summary mentions at least one
//! vocabulary keyword.
//!
//! Matching is a case-insensitive substring test (no word boundaries), so
//! "GPT" matches "GPT-5" and "ChatGPT". Title and summary are tested
//! separately; a keyword never spans the two. Membership only: an item that
//! matches five keywords is kept exactly like an item that matches one.

use crate::error::ConfigError;
use crate::item::NewsItem;
use regex::{Regex, RegexSet};
use tracing::debug;

/// Marker left behind by lossy UTF-8 decoding of invalid bytes.
const REPLACEMENT_CHAR: char = '\u{FFFD}';

// Dev logging gate: DIGEST_DEV_LOG=1 AND debug build.
pub(crate) fn dev_logging_enabled() -> bool {
    cfg!(debug_assertions) && std::env::var("DIGEST_DEV_LOG").ok().as_deref() == Some("1")
}

/// Outcome of checking a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    NoKeyword,
    Unreadable,
}

/// Compiled keyword vocabulary.
#[derive(Debug)]
pub struct KeywordFilter {
    keywords: Vec<String>,
    set: RegexSet,
    any: Regex,
}

impl KeywordFilter {
    /// Compile the vocabulary. Blank entries are ignored; if nothing usable is
    /// left the vocabulary is a configuration error.
    pub fn new<S: AsRef<str>>(vocabulary: &[S]) -> Result<Self, ConfigError> {
        let mut keywords: Vec<String> = Vec::new();
        for kw in vocabulary {
            let kw = kw.as_ref().trim();
            if kw.is_empty() {
                continue;
            }
            if !keywords.iter().any(|k| k.to_lowercase() == kw.to_lowercase()) {
                keywords.push(kw.to_string());
            }
        }
        if keywords.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }

        let patterns: Vec<String> = keywords
            .iter()
            .map(|k| format!("(?i){}", regex::escape(k)))
            .collect();
        let set = RegexSet::new(&patterns).map_err(|source| ConfigError::InvalidKeyword {
            keyword: keywords.join(", "),
            source,
        })?;
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let any = Regex::new(&format!("(?i)(?:{alternation})")).map_err(|source| {
            ConfigError::InvalidKeyword {
                keyword: keywords.join(", "),
                source,
            }
        })?;

        Ok(Self {
            keywords,
            set,
            any,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Fail closed: unreadable title or summary rejects the item.
    pub fn check(&self, item: &NewsItem) -> Verdict {
        let summary = item.summary_text();
        if !is_readable(&item.title) || !is_readable(summary) {
            return Verdict::Unreadable;
        }
        if self.any.is_match(&item.title) || self.any.is_match(summary) {
            Verdict::Keep
        } else {
            Verdict::NoKeyword
        }
    }

    pub fn matches(&self, item: &NewsItem) -> bool {
        self.check(item) == Verdict::Keep
    }

    /// Vocabulary entries found in the item, in vocabulary order.
    pub fn matched_keywords(&self, item: &NewsItem) -> Vec<&str> {
        let mut hits: Vec<usize> = self.set.matches(&item.title).into_iter().collect();
        hits.extend(self.set.matches(item.summary_text()));
        hits.sort_unstable();
        hits.dedup();
        hits.into_iter().map(|i| self.keywords[i].as_str()).collect()
    }

    /// Keep relevant items, preserving input order.
    pub fn filter(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        let before = items.len();
        let mut unreadable = 0usize;
        let kept: Vec<NewsItem> = items
            .into_iter()
            .filter(|item| match self.check(item) {
                Verdict::Keep => {
                    if dev_logging_enabled() {
                        debug!(
                            target: "relevance",
                            id = %item.fingerprint(),
                            matched = ?self.matched_keywords(item),
                            "kept"
                        );
                    }
                    true
                }
                Verdict::NoKeyword => false,
                Verdict::Unreadable => {
                    unreadable += 1;
                    debug!(target: "relevance", id = %item.fingerprint(), "unreadable text, dropped");
                    false
                }
            })
            .collect();

        debug!(
            target: "relevance",
            before,
            kept = kept.len(),
            unreadable,
            "keyword filter"
        );
        kept
    }
}

/// Text is readable unless lossy decoding left replacement characters in it.
pub fn is_readable(text: &str) -> bool {
    !text.contains(REPLACEMENT_CHAR)
}
