// src/ingest/providers/huggingface.rs
//! Hugging Face daily papers. The listing page gives the arXiv ids; one arXiv
//! `id_list` query gives titles, abstracts, authors and dates.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use super::rss::{parse_feed, FeedEntry};
use crate::ingest::types::{RawItem, SourceProvider};
use crate::item::{Language, SourceKind};

pub const PAPERS_URL: &str = "https://huggingface.co/papers";
pub const ARXIV_API: &str = "https://export.arxiv.org/api/query";
const MAX_PAPERS: usize = 20;
/// Being on the daily list is the popularity signal; papers carry no votes here.
const LISTED_PAPER_SCORE: u64 = 100;
const AUTHORS_SHOWN: usize = 3;

/// arXiv ids linked from the papers page, in page order, without repeats.
pub fn paper_ids(html: &str, limit: usize) -> Vec<String> {
    static RE_PAPER: OnceCell<Regex> = OnceCell::new();
    let re = RE_PAPER
        .get_or_init(|| Regex::new(r#"href="/papers/(\d{4}\.\d{4,5})"#).expect("paper href regex"));
    let mut ids: Vec<String> = Vec::new();
    for cap in re.captures_iter(html) {
        let id = &cap[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
            if ids.len() == limit {
                break;
            }
        }
    }
    ids
}

/// `http://arxiv.org/abs/2402.12345v2` → `2402.12345`.
pub fn arxiv_id(entry_id: &str) -> String {
    let tail = entry_id.rsplit("/abs/").next().unwrap_or(entry_id).trim();
    match tail.rsplit_once('v') {
        Some((id, version)) if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => {
            id.to_string()
        }
        _ => tail.to_string(),
    }
}

pub fn paper_url(id: &str) -> String {
    format!("{PAPERS_URL}/{id}")
}

fn entry_to_raw(entry: FeedEntry, outlet: &str) -> Option<RawItem> {
    let id = arxiv_id(entry.id.as_deref().unwrap_or(&entry.link));
    if id.is_empty() {
        return None;
    }

    let abstract_text = entry.summary.unwrap_or_default();
    let summary = if entry.authors.is_empty() {
        abstract_text
    } else {
        let mut names = entry.authors[..entry.authors.len().min(AUTHORS_SHOWN)].join(", ");
        if entry.authors.len() > AUTHORS_SHOWN {
            names.push_str(" et al.");
        }
        format!("{names}. {abstract_text}")
    };

    Some(RawItem {
        title: entry.title,
        summary: (!summary.trim().is_empty()).then_some(summary),
        url: paper_url(&id),
        outlet: outlet.to_string(),
        source: SourceKind::Academic,
        published: entry.published,
        social_score: Some(LISTED_PAPER_SCORE),
        language: Language::English,
    })
}

/// Raw items from an arXiv API (Atom) response.
pub fn parse_arxiv(xml: &str, outlet: &str) -> Result<Vec<RawItem>> {
    let entries = parse_feed(xml).context("arxiv response")?;
    Ok(entries
        .into_iter()
        .filter_map(|e| entry_to_raw(e, outlet))
        .collect())
}

pub struct HuggingFaceProvider {
    name: String,
    papers_url: String,
    arxiv_url: String,
    client: reqwest::Client,
    max_items: usize,
}

impl HuggingFaceProvider {
    pub fn with_endpoints(
        name: &str,
        papers_url: &str,
        arxiv_url: &str,
        client: reqwest::Client,
        max_items: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            papers_url: papers_url.to_string(),
            arxiv_url: arxiv_url.to_string(),
            client,
            max_items,
        }
    }
}

#[async_trait]
impl SourceProvider for HuggingFaceProvider {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>> {
        let page = self
            .client
            .get(&self.papers_url)
            .send()
            .await
            .context("hf papers get")?
            .error_for_status()
            .context("hf papers status")?
            .text()
            .await
            .context("hf papers body")?;

        let ids = paper_ids(&page, MAX_PAPERS.min(self.max_items));
        if ids.is_empty() {
            tracing::warn!(target: "ingest", provider = %self.name, "no paper ids on papers page");
            return Ok(Vec::new());
        }
        tracing::debug!(target: "ingest", provider = %self.name, papers = ids.len(), "fetching arxiv details");

        let xml = self
            .client
            .get(&self.arxiv_url)
            .query(&[("id_list", ids.join(",")), ("max_results", ids.len().to_string())])
            .send()
            .await
            .context("arxiv get")?
            .error_for_status()
            .context("arxiv status")?
            .text()
            .await
            .context("arxiv body")?;

        parse_arxiv(&xml, &self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
