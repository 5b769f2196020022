// src/ingest/types.rs
use crate::item::{Language, SourceKind};
use anyhow::Result;

/// Item as a fetcher sees it, before validation and normalization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub outlet: String, // e.g. "Hacker News", "TechCrunch"
    pub source: SourceKind,
    /// RFC 3339, RFC 2822 or unix seconds, exactly as the source gave it.
    pub published: Option<String>,
    pub social_score: Option<u64>,
    pub language: Language,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
}
