// src/ingest/providers/mod.rs
pub mod hackernews;
pub mod huggingface;
pub mod rss;

use crate::config::{FetchConfig, ProviderKind, SourceSpec};
use crate::ingest::types::SourceProvider;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Shared HTTP client for all providers.
pub fn http_client(cfg: &FetchConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()
        .context("building http client")
}

/// Build the provider for one configured source.
pub fn build(
    spec: &SourceSpec,
    cfg: &FetchConfig,
    client: &reqwest::Client,
) -> Result<Arc<dyn SourceProvider>> {
    let kind = spec.resolved_kind()?;
    Ok(match spec.provider {
        ProviderKind::Rss => {
            let url = spec
                .url
                .as_deref()
                .ok_or_else(|| anyhow!("rss source `{}` has no url", spec.id))?;
            Arc::new(rss::RssProvider::from_url(
                &spec.name,
                kind,
                spec.language,
                url,
                client.clone(),
            ))
        }
        ProviderKind::Huggingface => Arc::new(huggingface::HuggingFaceProvider::with_endpoints(
            &spec.name,
            spec.url.as_deref().unwrap_or(huggingface::PAPERS_URL),
            huggingface::ARXIV_API,
            client.clone(),
            cfg.max_items_per_source,
        )),
        ProviderKind::Hackernews => Arc::new(hackernews::HackerNewsProvider::with_base(
            &spec.name,
            spec.url.as_deref().unwrap_or(hackernews::API_BASE),
            client.clone(),
            cfg.max_items_per_source,
        )),
    })
}

/// Providers for every enabled source, in configured order.
pub fn build_all<'a, I>(specs: I, cfg: &FetchConfig) -> Result<Vec<Arc<dyn SourceProvider>>>
where
    I: IntoIterator<Item = &'a SourceSpec>,
{
    let client = http_client(cfg)?;
    specs
        .into_iter()
        .map(|s| build(s, cfg, &client).with_context(|| format!("source `{}`", s.id)))
        .collect()
}
