// src/telemetry.rs
//! Process-wide observability: tracing subscriber and Prometheus recorder.

use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "ai_news_digest=info,pipeline=info,ingest=info,notify=info,digest=info,warn";
const ENV_LOG_FORMAT: &str = "DIGEST_LOG_FORMAT";

/// `RUST_LOG` wins over the default filter. `DIGEST_LOG_FORMAT=json` switches
/// to one JSON object per line. Debug builds also honor `DIGEST_DEV_LOG=1`,
/// which raises `relevance` and `dedup` to debug.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = DEFAULT_LOG_FILTER.to_string();
        if crate::relevance::dev_logging_enabled() {
            directives.push_str(",relevance=debug,dedup=debug");
        }
        EnvFilter::new(directives)
    });

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("prometheus: install exporter on {addr}"))?;
    gauge!("app_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
