//! # Source Weights
//!
//! Maps each [`SourceKind`] to a trust weight in `[0.0, 1.0]` used by the
//! ranking engine, and resolves free-form source ids ("hackernews",
//! "36kr", "Hugging-Face") to their kind.
//!
//! - Loads from the `[source_weights]` TOML table; missing kinds keep the seed value.
//! - Id lookup is case-insensitive with normalization of punctuation, dashes, etc.
//! - Fallback order for ids: aliases → substring match → none.

use crate::error::ConfigError;
use crate::item::SourceKind;
use serde::Deserialize;
use std::collections::HashMap;

/// Raw TOML shape: every field optional so a partial table overrides the seed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceWeightsToml {
    pub academic: Option<f64>,
    pub mainstream_media: Option<f64>,
    pub forum: Option<f64>,
    pub aggregator: Option<f64>,
    pub social: Option<f64>,
}

/// Per-kind quality weights. Always holds a value for every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceWeights {
    weights: HashMap<SourceKind, f64>,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceWeights {
    /// Built-in seed: moderated and peer-reviewed outlets above open social feeds.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        for (k, w) in [
            (SourceKind::Academic, 1.0),
            (SourceKind::MainstreamMedia, 0.95),
            (SourceKind::Forum, 0.90),
            (SourceKind::Aggregator, 0.50),
            (SourceKind::Social, 0.60),
        ] {
            weights.insert(k, w);
        }
        Self { weights }
    }

    /// Overlay a TOML table on the seed. Weights must be finite and in `[0.0, 1.0]`.
    pub fn from_toml(raw: &SourceWeightsToml) -> Result<Self, ConfigError> {
        let mut out = Self::default_seed();
        for (kind, value) in [
            (SourceKind::Academic, raw.academic),
            (SourceKind::MainstreamMedia, raw.mainstream_media),
            (SourceKind::Forum, raw.forum),
            (SourceKind::Aggregator, raw.aggregator),
            (SourceKind::Social, raw.social),
        ] {
            if let Some(w) = value {
                out.set(kind, w)?;
            }
        }
        Ok(out)
    }

    pub fn set(&mut self, kind: SourceKind, weight: f64) -> Result<(), ConfigError> {
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::InvalidWeight {
                name: format!("source_weights.{}", kind),
                value: weight,
            });
        }
        self.weights.insert(kind, weight);
        Ok(())
    }

    pub fn weight_for(&self, kind: SourceKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }
}

/// Resolve a source id to its kind.
///
/// Steps:
/// 1. Alias lookup (normalized).
/// 2. Substring fallback (e.g. "hacker news frontpage" → "hacker news").
/// 3. `None`: the caller must state the kind explicitly.
pub fn kind_for_source_id(id: &str) -> Option<SourceKind> {
    let s = normalize(id);
    if s.is_empty() {
        return None;
    }
    let aliases = alias_table();

    if let Some((_, k)) = aliases.iter().find(|(a, _)| *a == s) {
        return Some(*k);
    }

    // Longest alias first so "hacker news" wins over "news"-like short keys.
    let mut by_len: Vec<&(&str, SourceKind)> = aliases.iter().collect();
    by_len.sort_by_key(|(a, _)| std::cmp::Reverse(a.len()));
    by_len
        .into_iter()
        .find(|(a, _)| a.len() > 3 && s.contains(a))
        .map(|(_, k)| *k)
}

fn alias_table() -> &'static [(&'static str, SourceKind)] {
    &[
        ("huggingface", SourceKind::Academic),
        ("hugging face", SourceKind::Academic),
        ("hugging face papers", SourceKind::Academic),
        ("arxiv", SourceKind::Academic),
        ("techcrunch", SourceKind::MainstreamMedia),
        ("theverge", SourceKind::MainstreamMedia),
        ("the verge", SourceKind::MainstreamMedia),
        ("36kr", SourceKind::MainstreamMedia),
        ("huxiu", SourceKind::MainstreamMedia),
        ("hackernews", SourceKind::Forum),
        ("hacker news", SourceKind::Forum),
        ("hn", SourceKind::Forum),
        ("reddit", SourceKind::Forum),
        ("twitter", SourceKind::Social),
        ("nitter", SourceKind::Social),
        ("x", SourceKind::Social),
        ("weibo", SourceKind::Social),
        ("sogou", SourceKind::Aggregator),
        ("wechat", SourceKind::Aggregator),
        ("weixin", SourceKind::Aggregator),
        ("tophub", SourceKind::Aggregator),
    ]
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_lowercase();

    // Replace common separators with spaces.
    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    out = out.replace(['\n', '\r', '\t', '.', ',', '’', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_covers_every_kind() {
        let w = SourceWeights::default_seed();
        for k in SourceKind::ALL {
            assert!(w.weight_for(k) > 0.0, "{k} has no weight");
        }
        assert!(w.weight_for(SourceKind::Academic) > w.weight_for(SourceKind::Social));
    }

    #[test]
    fn partial_table_overrides_seed() {
        let raw: SourceWeightsToml = toml::from_str("social = 0.2\nforum = 1.0").unwrap();
        let w = SourceWeights::from_toml(&raw).unwrap();
        assert!((w.weight_for(SourceKind::Social) - 0.2).abs() < 1e-9);
        assert!((w.weight_for(SourceKind::Forum) - 1.0).abs() < 1e-9);
        assert!((w.weight_for(SourceKind::Academic) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_weight_rejected() {
        let raw = SourceWeightsToml {
            social: Some(-0.1),
            ..Default::default()
        };
        assert!(matches!(
            SourceWeights::from_toml(&raw),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn weight_above_one_rejected() {
        let raw: SourceWeightsToml = toml::from_str("forum = 1.5").unwrap();
        match SourceWeights::from_toml(&raw) {
            Err(ConfigError::InvalidWeight { name, value }) => {
                assert_eq!(name, "source_weights.forum");
                assert!((value - 1.5).abs() < 1e-9);
            }
            other => panic!("expected InvalidWeight, got {other:?}"),
        }
    }

    #[test]
    fn unknown_table_key_rejected() {
        assert!(toml::from_str::<SourceWeightsToml>("blogs = 0.3").is_err());
    }

    #[test]
    fn alias_match() {
        assert_eq!(kind_for_source_id("hackernews"), Some(SourceKind::Forum));
        assert_eq!(kind_for_source_id("36kr"), Some(SourceKind::MainstreamMedia));
        assert_eq!(kind_for_source_id("weixin"), Some(SourceKind::Aggregator));
    }

    #[test]
    fn dash_and_case_normalization() {
        assert_eq!(kind_for_source_id("Hugging-Face"), Some(SourceKind::Academic));
        assert_eq!(kind_for_source_id("THE_VERGE"), Some(SourceKind::MainstreamMedia));
    }

    #[test]
    fn substring_match() {
        assert_eq!(
            kind_for_source_id("Hacker News frontpage"),
            Some(SourceKind::Forum)
        );
    }

    #[test]
    fn unknown_id_is_none() {
        assert_eq!(kind_for_source_id("TotallyUnknown"), None);
        assert_eq!(kind_for_source_id("  "), None);
    }
}
