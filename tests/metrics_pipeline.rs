// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use ai_news_digest::config::FetchConfig;
use ai_news_digest::ingest::{self, providers, providers::rss::RssProvider, types::SourceProvider};
use ai_news_digest::{Language, NewsItem, PipelineConfig, SelectionPipeline, SourceKind};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;

// One test per binary: the recorder is process-global.
#[tokio::test]
async fn metrics_exposed_after_selection_and_ingest() {
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let now = Utc::now();
    let items = vec![NewsItem {
        title: "OpenAI ships GPT-5".into(),
        summary: None,
        url: "https://m.test/1".into(),
        source: SourceKind::MainstreamMedia,
        outlet: "m".into(),
        published_at: now,
        social_score: 3,
        language: Language::English,
    }];
    let pipeline = SelectionPipeline::new(PipelineConfig::default()).unwrap();
    let sel = pipeline.run(items, now);
    assert_eq!(sel.stats.selected, 1);

    // Nothing listens on port 1: the send itself fails.
    let cfg = FetchConfig {
        timeout_secs: 5,
        ..FetchConfig::default()
    };
    let client = providers::http_client(&cfg).unwrap();
    let dead: Arc<dyn SourceProvider> = Arc::new(RssProvider::from_url(
        "dead",
        SourceKind::MainstreamMedia,
        Language::English,
        "http://127.0.0.1:1/feed.xml",
        client,
    ));
    let report = ingest::collect(&[dead], &cfg, now).await;
    assert_eq!(report.failed_providers(), 1);

    let out = handle.render();
    for needle in [
        "pipeline_candidates_total",
        "pipeline_filtered_total",
        "pipeline_dedup_merged_total",
        "pipeline_selected_total",
        "pipeline_run_ms",
        "pipeline_last_run_ts",
        "ingest_fetch_ms",
        "ingest_last_run_ts",
    ] {
        assert!(out.contains(needle), "missing {needle}");
    }
    // A failed provider counts once, not once per layer.
    assert!(
        out.lines().any(|l| l == "ingest_provider_errors_total 1"),
        "provider error count:\n{out}"
    );
}
