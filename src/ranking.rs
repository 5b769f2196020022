// src/ranking.rs
//! Ranking engine: weighted sum of recency, source quality and social signal.
//!
//! ```text
//! recency(age) = 1.0                                 age <= 0
//!              = 1.0 - (1.0 - floor) * age / window  0 < age <= window
//!              = 0.0                                 age > window
//! social(s)    = min(1, ln(1 + s) / ln(1 + saturation))
//! total        = w_recency * recency + w_source * source_weight + w_social * social
//! ```
//!
//! Order is total: score desc, then `published_at` desc, then source priority,
//! then input position.

use crate::config::RankingConfig;
use crate::dedup::Cluster;
use crate::item::NewsItem;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// Per-component scores, already multiplied by their weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub recency: f64,
    pub source: f64,
    pub social: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub item: NewsItem,
    pub score: ScoreBreakdown,
    /// Position in the ranking input; last tie-breaker.
    pub position: usize,
    /// Size of the dedup cluster the item represents.
    pub cluster_size: usize,
}

#[derive(Debug, Clone)]
pub struct RankingEngine {
    cfg: RankingConfig,
}

impl RankingEngine {
    pub fn new(cfg: RankingConfig) -> Self {
        Self { cfg }
    }

    /// Unweighted recency in [0, 1]. Non-increasing in `age`.
    pub fn recency(&self, age: Duration) -> f64 {
        if age <= Duration::zero() {
            return 1.0;
        }
        let window = self.cfg.freshness_window;
        if age > window {
            return 0.0;
        }
        let frac = age.num_milliseconds() as f64 / window.num_milliseconds().max(1) as f64;
        1.0 - (1.0 - self.cfg.recency_floor) * frac
    }

    /// Unweighted social signal in [0, 1] with diminishing returns.
    pub fn social(&self, social_score: u64) -> f64 {
        if social_score == 0 {
            return 0.0;
        }
        let saturation = (self.cfg.social_saturation.max(1) as f64).ln_1p();
        ((social_score as f64).ln_1p() / saturation).min(1.0)
    }

    pub fn score(&self, item: &NewsItem, social_signal: u64, now: DateTime<Utc>) -> ScoreBreakdown {
        let recency = self.cfg.recency_weight * self.recency(now - item.published_at);
        let source = self.cfg.source_weight * self.cfg.source_weights.weight_for(item.source);
        let social = self.cfg.social_weight * self.social(social_signal);
        ScoreBreakdown {
            recency,
            source,
            social,
            total: recency + source + social,
        }
    }

    /// Score and sort dedup clusters.
    pub fn rank(&self, clusters: Vec<Cluster>, now: DateTime<Utc>) -> Vec<RankedItem> {
        let mut ranked: Vec<RankedItem> = clusters
            .into_iter()
            .enumerate()
            .map(|(position, c)| {
                let signal = if self.cfg.aggregate_cluster_social {
                    c.social_total
                } else {
                    c.representative.social_score
                };
                RankedItem {
                    score: self.score(&c.representative, signal, now),
                    item: c.representative,
                    position,
                    cluster_size: c.members,
                }
            })
            .collect();
        ranked.sort_by(compare);
        ranked
    }

    /// Rank plain items, each treated as its own cluster.
    pub fn rank_items(&self, items: Vec<NewsItem>, now: DateTime<Utc>) -> Vec<RankedItem> {
        self.rank(items.into_iter().map(Cluster::single).collect(), now)
    }
}

/// Strict ranking order; `Less` means `a` comes first.
pub fn compare(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.score
        .total
        .total_cmp(&a.score.total)
        .then_with(|| b.item.published_at.cmp(&a.item.published_at))
        .then_with(|| a.item.source.priority().cmp(&b.item.source.priority()))
        .then_with(|| a.position.cmp(&b.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Language, SourceKind};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
    }

    fn item(title: &str, source: SourceKind, age: Duration, social: u64) -> NewsItem {
        NewsItem {
            title: title.into(),
            summary: None,
            url: format!("https://example.test/{title}"),
            source,
            outlet: "test".into(),
            published_at: now() - age,
            social_score: social,
            language: Language::English,
        }
    }

    fn engine() -> RankingEngine {
        RankingEngine::new(RankingConfig::default())
    }

    #[test]
    fn recency_is_monotonic_and_zero_outside_window() {
        let e = engine();
        let mut last = f64::INFINITY;
        for h in 0..=48 {
            let r = e.recency(Duration::hours(h));
            assert!(r <= last, "recency rose at {h}h");
            last = r;
        }
        assert_eq!(e.recency(Duration::hours(-3)), 1.0);
        assert!((e.recency(Duration::hours(36)) - 0.5).abs() < 1e-9);
        assert_eq!(e.recency(Duration::hours(37)), 0.0);
    }

    #[test]
    fn social_is_bounded_with_diminishing_returns() {
        let e = engine();
        assert_eq!(e.social(0), 0.0);
        assert_eq!(e.social(1_000_000), 1.0);
        let d1 = e.social(20) - e.social(10);
        let d2 = e.social(110) - e.social(100);
        assert!(d1 > d2);
    }

    #[test]
    fn fresh_item_beats_stale_viral_item() {
        let e = engine();
        let a = item("fresh", SourceKind::MainstreamMedia, Duration::hours(1), 0);
        let b = item("viral", SourceKind::MainstreamMedia, Duration::days(10), 10_000);
        let out = e.rank_items(vec![b, a], now());
        assert_eq!(out[0].item.title, "fresh");
        assert_eq!(out[1].item.title, "viral");
    }

    #[test]
    fn equal_scores_break_on_published_then_source_then_position() {
        let mut cfg = RankingConfig::default();
        cfg.recency_weight = 0.0;
        cfg.source_weight = 0.0;
        cfg.social_weight = 0.0;
        let e = RankingEngine::new(cfg);

        let older = item("older", SourceKind::Academic, Duration::hours(5), 0);
        let newer = item("newer", SourceKind::Social, Duration::hours(1), 0);
        let forum = item("forum", SourceKind::Forum, Duration::hours(3), 0);
        let academic = item("academic", SourceKind::Academic, Duration::hours(3), 0);
        let academic2 = item("academic2", SourceKind::Academic, Duration::hours(3), 0);

        let out = e.rank_items(vec![older, forum, academic2, newer, academic], now());
        let titles: Vec<_> = out.iter().map(|r| r.item.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "academic2", "academic", "forum", "older"]);
    }

    #[test]
    fn cluster_social_used_only_when_enabled() {
        let base = item("x", SourceKind::Forum, Duration::hours(2), 1);
        let cluster = Cluster {
            representative: base.clone(),
            members: 3,
            social_total: 900,
        };

        let off = engine().rank(vec![cluster.clone()], now());
        let mut cfg = RankingConfig::default();
        cfg.aggregate_cluster_social = true;
        let on = RankingEngine::new(cfg).rank(vec![cluster], now());

        assert!(on[0].score.social > off[0].score.social);
        assert_eq!(on[0].cluster_size, 3);
    }
}
