// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod item;
pub mod source_weights;

// Selection pipeline stages
pub mod dedup;
pub mod pipeline;
pub mod ranking;
pub mod relevance;
pub mod selector;

// Outer system: sources, translation, delivery, jobs
pub mod digest;
pub mod ingest;
pub mod notify;
pub mod scheduler;
pub mod telemetry;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::config::{AppConfig, PipelineConfig, RankingConfig};
pub use crate::error::ConfigError;
pub use crate::item::{Language, NewsItem, SourceKind};
pub use crate::pipeline::{Selection, SelectionPipeline, SelectionStats};
pub use crate::ranking::{RankedItem, ScoreBreakdown};
