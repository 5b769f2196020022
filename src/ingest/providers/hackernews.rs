// src/ingest/providers/hackernews.rs
//! Hacker News top stories via the public Firebase API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::ingest::types::{RawItem, SourceProvider};
use crate::item::{Language, SourceKind};

pub const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
/// Story ids looked at per run (the API returns up to 500).
const TOP_STORIES_SCANNED: usize = 100;
/// Parallel item-detail requests.
const DETAIL_CONCURRENCY: usize = 10;
const SUMMARY_TEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HnStory {
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub score: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub descendants: Option<u64>,
}

/// Map one API item to a raw item. Non-stories and untitled stories are skipped.
/// Self posts link to their discussion page.
pub fn story_to_raw(story: HnStory, outlet: &str) -> Option<RawItem> {
    if story.kind != "story" {
        return None;
    }
    let title = story.title.filter(|t| !t.trim().is_empty())?;
    let url = story
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", story.id));

    let mut summary: String = story
        .text
        .unwrap_or_default()
        .chars()
        .take(SUMMARY_TEXT_CHARS)
        .collect();
    if let Some(n) = story.descendants.filter(|n| *n > 0) {
        if summary.is_empty() {
            summary = format!("{n} comments");
        } else {
            summary.push_str(&format!(" ({n} comments)"));
        }
    }

    Some(RawItem {
        title,
        summary: (!summary.is_empty()).then_some(summary),
        url,
        outlet: outlet.to_string(),
        source: SourceKind::Forum,
        published: story.time.map(|t| t.to_string()),
        social_score: Some(story.score.unwrap_or(0)),
        language: Language::English,
    })
}

pub struct HackerNewsProvider {
    name: String,
    base: String,
    client: reqwest::Client,
    max_items: usize,
}

impl HackerNewsProvider {
    pub fn with_base(name: &str, base: &str, client: reqwest::Client, max_items: usize) -> Self {
        Self {
            name: name.to_string(),
            base: base.trim_end_matches('/').to_string(),
            client,
            max_items,
        }
    }

    async fn fetch_story(client: reqwest::Client, base: String, id: u64) -> Result<Option<HnStory>> {
        let url = format!("{base}/item/{id}.json");
        let story = client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("hn get item {id}"))?
            .error_for_status()?
            .json::<Option<HnStory>>()
            .await
            .with_context(|| format!("hn decode item {id}"))?;
        Ok(story)
    }
}

#[async_trait]
impl SourceProvider for HackerNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        let ids: Vec<u64> = self
            .client
            .get(format!("{}/topstories.json", self.base))
            .send()
            .await
            .context("hn get topstories")?
            .error_for_status()
            .context("hn topstories status")?
            .json()
            .await
            .context("hn decode topstories")?;

        let sem = Arc::new(Semaphore::new(DETAIL_CONCURRENCY));
        let mut set = JoinSet::new();
        for (pos, id) in ids.into_iter().take(TOP_STORIES_SCANNED).enumerate() {
            let sem = Arc::clone(&sem);
            let client = self.client.clone();
            let base = self.base.clone();
            set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                (pos, Self::fetch_story(client, base, id).await)
            });
        }

        let mut stories: Vec<(usize, HnStory)> = Vec::new();
        let mut failed = 0usize;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((pos, Ok(Some(story)))) => stories.push((pos, story)),
                Ok((_, Ok(None))) => {}
                Ok((_, Err(e))) => {
                    failed += 1;
                    tracing::debug!(target: "ingest", error = %format!("{e:#}"), "hn item failed");
                }
                Err(e) => {
                    failed += 1;
                    tracing::debug!(target: "ingest", error = %e, "hn item task failed");
                }
            }
        }
        if failed > 0 {
            counter!("ingest_hn_item_errors_total").increment(failed as u64);
        }

        // Highest score first; API order breaks ties.
        stories.sort_by(|(pa, a), (pb, b)| {
            b.score
                .unwrap_or(0)
                .cmp(&a.score.unwrap_or(0))
                .then_with(|| pa.cmp(pb))
        });
        Ok(stories
            .into_iter()
            .filter_map(|(_, s)| story_to_raw(s, &self.name))
            .take(self.max_items)
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
