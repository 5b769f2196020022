// src/pipeline.rs
//! Selection pipeline: relevance filter → near-duplicate detector → ranking → top-N.
//!
//! Pure and synchronous. Construction validates the configuration (the only
//! fatal error class); a run over a batch always completes.

use crate::config::PipelineConfig;
use crate::dedup::Deduplicator;
use crate::error::ConfigError;
use crate::item::NewsItem;
use crate::ranking::{RankedItem, RankingEngine};
use crate::relevance::KeywordFilter;
use crate::selector::select_top;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::info;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_candidates_total",
            "Items entering the selection pipeline."
        );
        describe_counter!(
            "pipeline_filtered_total",
            "Items dropped by the keyword filter."
        );
        describe_counter!(
            "pipeline_dedup_merged_total",
            "Items folded into an earlier representative."
        );
        describe_counter!("pipeline_selected_total", "Items selected for the digest.");
        describe_histogram!("pipeline_run_ms", "Selection run time in milliseconds.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the selection pipeline last ran."
        );
    });
}

/// Stage-by-stage counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    pub candidates: usize,
    pub relevant: usize,
    pub unique: usize,
    pub selected: usize,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub items: Vec<RankedItem>,
    pub stats: SelectionStats,
}

impl Selection {
    pub fn into_items(self) -> Vec<NewsItem> {
        self.items.into_iter().map(|r| r.item).collect()
    }
}

#[derive(Debug)]
pub struct SelectionPipeline {
    filter: KeywordFilter,
    dedup: Deduplicator,
    ranking: RankingEngine,
    top_n: usize,
}

impl SelectionPipeline {
    pub fn new(cfg: PipelineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            filter: KeywordFilter::new(&cfg.keywords)?,
            dedup: Deduplicator::new(cfg.similarity_threshold, cfg.compare_summaries),
            ranking: RankingEngine::new(cfg.ranking),
            top_n: cfg.top_n,
        })
    }

    /// Run all stages over one batch. `items` must already be in the configured
    /// source order; `now` is the clock the recency component is measured against.
    pub fn run(&self, items: Vec<NewsItem>, now: DateTime<Utc>) -> Selection {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();

        let candidates = items.len();
        let relevant = self.filter.filter(items);
        let relevant_len = relevant.len();

        let clusters = self.dedup.cluster(relevant);
        let unique = clusters.len();

        let ranked = self.ranking.rank(clusters, now);
        let selected = select_top(ranked, self.top_n);

        let stats = SelectionStats {
            candidates,
            relevant: relevant_len,
            unique,
            selected: selected.len(),
        };

        // Telemetry
        counter!("pipeline_candidates_total").increment(candidates as u64);
        counter!("pipeline_filtered_total").increment((candidates - relevant_len) as u64);
        counter!("pipeline_dedup_merged_total").increment((relevant_len - unique) as u64);
        counter!("pipeline_selected_total").increment(stats.selected as u64);
        histogram!("pipeline_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("pipeline_last_run_ts").set(now.timestamp() as f64);

        info!(
            target: "pipeline",
            candidates,
            relevant = relevant_len,
            unique,
            selected = stats.selected,
            top_n = self.top_n,
            "selection done"
        );

        Selection {
            items: selected,
            stats,
        }
    }
}
