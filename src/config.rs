// src/config.rs
//! Application configuration: selection pipeline tuning, source list, fetch
//! limits, schedule and mail settings.
//!
//! Resolution order:
//! 1) $DIGEST_CONFIG_PATH (must exist)
//! 2) config/digest.toml
//! 3) built-in defaults
//!
//! `DIGEST_TOP_N` and `DIGEST_SIMILARITY_THRESHOLD` override file values and
//! go through the same validation. Secrets never live in the file.

use crate::error::ConfigError;
use crate::item::{Language, SourceKind};
use crate::source_weights::{kind_for_source_id, SourceWeights, SourceWeightsToml};
use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const ENV_TOP_N: &str = "DIGEST_TOP_N";
pub const ENV_SIMILARITY_THRESHOLD: &str = "DIGEST_SIMILARITY_THRESHOLD";

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const DEFAULT_FRESHNESS_WINDOW_HOURS: i64 = 36;

pub const DEFAULT_RECENCY_WEIGHT: f64 = 0.5;
pub const DEFAULT_SOURCE_WEIGHT: f64 = 0.3;
pub const DEFAULT_SOCIAL_WEIGHT: f64 = 0.2;
/// Recency value at the far edge of the freshness window.
pub const DEFAULT_RECENCY_FLOOR: f64 = 0.5;
/// Social score at which the social component saturates at 1.0.
pub const DEFAULT_SOCIAL_SATURATION: u64 = 1_000;

/// Default AI vocabulary. Short acronyms such as "AI", "RAG" or "AGI" are left
/// out: matching is plain substring, and they occur inside ordinary words.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "LLM",
    "GPT",
    "ChatGPT",
    "Claude",
    "Gemini",
    "Llama",
    "Mistral",
    "neural network",
    "transformer",
    "diffusion",
    "generative",
    "OpenAI",
    "Anthropic",
    "DeepMind",
    "Meta AI",
    "NVIDIA",
    "AI agent",
    "fine-tuning",
    "RLHF",
    "reasoning model",
    "multimodal",
    "vision model",
    "language model",
    "foundation model",
    "Copilot",
    "AI coding",
    "AI assistant",
    "人工智能",
    "大模型",
    "机器学习",
    "深度学习",
    "神经网络",
    "生成式AI",
    "智能体",
    "AI芯片",
    "算力",
    "大语言模型",
    "多模态",
    "AI助手",
    "AI编程",
    "智谱",
    "百川",
    "文心一言",
    "通义千问",
    "讯飞星火",
    "Kimi",
    "月之暗面",
];

/* ----------------------------
Validated runtime config
---------------------------- */

/// Everything the selection pipeline needs. Passed in at construction;
/// nothing is read from process-wide state during a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub keywords: Vec<String>,
    /// Inclusive lower bound for near-duplicate similarity, in (0, 1].
    pub similarity_threshold: f64,
    /// Also compare summaries when both sides have one.
    pub compare_summaries: bool,
    pub top_n: usize,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub recency_weight: f64,
    pub source_weight: f64,
    pub social_weight: f64,
    pub recency_floor: f64,
    pub social_saturation: u64,
    pub freshness_window: Duration,
    /// Rank on the summed social score of a whole dedup cluster.
    pub aggregate_cluster_social: bool,
    pub source_weights: SourceWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            recency_weight: DEFAULT_RECENCY_WEIGHT,
            source_weight: DEFAULT_SOURCE_WEIGHT,
            social_weight: DEFAULT_SOCIAL_WEIGHT,
            recency_floor: DEFAULT_RECENCY_FLOOR,
            social_saturation: DEFAULT_SOCIAL_SATURATION,
            freshness_window: Duration::hours(DEFAULT_FRESHNESS_WINDOW_HOURS),
            aggregate_cluster_social: false,
            source_weights: SourceWeights::default_seed(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            compare_summaries: false,
            top_n: DEFAULT_TOP_N,
            ranking: RankingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Fail fast on anything that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::EmptyVocabulary);
        }
        if self.top_n == 0 {
            return Err(ConfigError::InvalidTopN(0));
        }
        let t = self.similarity_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(ConfigError::ThresholdOutOfRange(t));
        }
        self.ranking.validate()
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("ranking.recency_weight", self.recency_weight),
            ("ranking.source_weight", self.source_weight),
            ("ranking.social_weight", self.social_weight),
            ("ranking.recency_floor", self.recency_floor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if self.recency_floor > 1.0 {
            return Err(ConfigError::InvalidWeight {
                name: "ranking.recency_floor".into(),
                value: self.recency_floor,
            });
        }
        if self.social_saturation == 0 {
            return Err(ConfigError::NonPositive {
                name: "ranking.social_saturation",
                value: 0.0,
            });
        }
        if self.freshness_window <= Duration::zero() {
            return Err(ConfigError::InvalidFreshnessWindow(
                self.freshness_window.num_hours(),
            ));
        }
        Ok(())
    }
}

/* ----------------------------
Outer-system config
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Rss,
    Hackernews,
    Huggingface,
}

/// One configured source. Order in the file is the concatenation order of
/// fetched items, which anchors dedup and breaks final ranking ties.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    #[serde(default)]
    pub kind: Option<SourceKind>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl SourceSpec {
    /// Explicit `kind` wins; otherwise resolve through the id aliases.
    pub fn resolved_kind(&self) -> Result<SourceKind, ConfigError> {
        self.kind
            .or_else(|| kind_for_source_id(&self.id))
            .ok_or_else(|| ConfigError::UnknownSource(self.id.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    pub max_items_per_source: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_concurrency: 4,
            max_items_per_source: 50,
            user_agent: format!("ai-news-digest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_hours: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_hours: 24 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub subject_prefix: String,
    pub subscribers_path: PathBuf,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            subject_prefix: "AI News Daily".into(),
            subscribers_path: PathBuf::from("data/subscribers.txt"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub fetch: FetchConfig,
    pub sources: Vec<SourceSpec>,
    pub schedule: ScheduleConfig,
    pub email: EmailConfig,
}

/* ----------------------------
File schema (TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct FileConfig {
    pipeline: PipelineSection,
    ranking: RankingSection,
    source_weights: SourceWeightsToml,
    fetch: FetchConfig,
    sources: Vec<SourceSpec>,
    schedule: ScheduleConfig,
    email: EmailConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineSection::default(),
            ranking: RankingSection::default(),
            source_weights: SourceWeightsToml::default(),
            fetch: FetchConfig::default(),
            sources: default_sources(),
            schedule: ScheduleConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PipelineSection {
    top_n: i64,
    similarity_threshold: f64,
    freshness_window_hours: i64,
    compare_summaries: bool,
    keywords: Vec<String>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N as i64,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            freshness_window_hours: DEFAULT_FRESHNESS_WINDOW_HOURS,
            compare_summaries: false,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RankingSection {
    recency_weight: f64,
    source_weight: f64,
    social_weight: f64,
    recency_floor: f64,
    social_saturation: u64,
    aggregate_cluster_social: bool,
}

impl Default for RankingSection {
    fn default() -> Self {
        Self {
            recency_weight: DEFAULT_RECENCY_WEIGHT,
            source_weight: DEFAULT_SOURCE_WEIGHT,
            social_weight: DEFAULT_SOCIAL_WEIGHT,
            recency_floor: DEFAULT_RECENCY_FLOOR,
            social_saturation: DEFAULT_SOCIAL_SATURATION,
            aggregate_cluster_social: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sources() -> Vec<SourceSpec> {
    let rss = |id: &str, name: &str, url: &str, language: Language| SourceSpec {
        id: id.into(),
        name: name.into(),
        provider: ProviderKind::Rss,
        kind: None,
        url: Some(url.into()),
        language,
        enabled: true,
    };
    vec![
        SourceSpec {
            id: "huggingface".into(),
            name: "Hugging Face Papers".into(),
            provider: ProviderKind::Huggingface,
            kind: None,
            url: None,
            language: Language::English,
            enabled: true,
        },
        rss(
            "36kr",
            "36氪",
            "https://36kr.com/feed",
            Language::Chinese,
        ),
        rss(
            "huxiu",
            "虎嗅",
            "https://www.huxiu.com/rss/0.xml",
            Language::Chinese,
        ),
        rss(
            "techcrunch",
            "TechCrunch",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            Language::English,
        ),
        rss(
            "theverge",
            "The Verge",
            "https://www.theverge.com/rss/index.xml",
            Language::English,
        ),
        SourceSpec {
            id: "hackernews".into(),
            name: "Hacker News".into(),
            provider: ProviderKind::Hackernews,
            kind: None,
            url: None,
            language: Language::English,
            enabled: true,
        },
        SourceSpec {
            kind: Some(SourceKind::Social),
            ..rss(
                "nitter-openai",
                "@OpenAI",
                "https://nitter.poast.org/OpenAI/rss",
                Language::English,
            )
        },
    ]
}

/* ----------------------------
Loading
---------------------------- */

impl AppConfig {
    /// Built-in defaults (no file, no env).
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_raw(FileConfig::default())
    }

    /// Parse a TOML string. Env overrides are not applied.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let raw: FileConfig = toml::from_str(s)?;
        Self::from_raw(raw)
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut raw: FileConfig = toml::from_str(&content)?;
        apply_env_overrides(&mut raw)?;
        Self::from_raw(raw)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from(Path::new(&p));
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        let mut raw = FileConfig::default();
        apply_env_overrides(&mut raw)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: FileConfig) -> Result<Self, ConfigError> {
        let p = raw.pipeline;
        let top_n = usize::try_from(p.top_n).map_err(|_| ConfigError::InvalidTopN(p.top_n))?;
        let freshness_window = Duration::try_hours(p.freshness_window_hours)
            .filter(|d| *d > Duration::zero())
            .ok_or(ConfigError::InvalidFreshnessWindow(p.freshness_window_hours))?;

        let r = raw.ranking;
        let pipeline = PipelineConfig {
            keywords: p.keywords,
            similarity_threshold: p.similarity_threshold,
            compare_summaries: p.compare_summaries,
            top_n,
            ranking: RankingConfig {
                recency_weight: r.recency_weight,
                source_weight: r.source_weight,
                social_weight: r.social_weight,
                recency_floor: r.recency_floor,
                social_saturation: r.social_saturation,
                freshness_window,
                aggregate_cluster_social: r.aggregate_cluster_social,
                source_weights: SourceWeights::from_toml(&raw.source_weights)?,
            },
        };
        pipeline.validate()?;

        for s in &raw.sources {
            s.resolved_kind()?;
        }
        if raw.fetch.max_concurrency == 0 {
            return Err(ConfigError::NonPositive {
                name: "fetch.max_concurrency",
                value: 0.0,
            });
        }
        if raw.fetch.timeout_secs == 0 {
            return Err(ConfigError::NonPositive {
                name: "fetch.timeout_secs",
                value: 0.0,
            });
        }
        if raw.schedule.interval_hours == 0 {
            return Err(ConfigError::NonPositive {
                name: "schedule.interval_hours",
                value: 0.0,
            });
        }

        Ok(Self {
            pipeline,
            fetch: raw.fetch,
            sources: raw.sources,
            schedule: raw.schedule,
            email: raw.email,
        })
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

fn apply_env_overrides(raw: &mut FileConfig) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var(ENV_TOP_N) {
        raw.pipeline.top_n = v.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnv {
            name: ENV_TOP_N,
            value: v.clone(),
        })?;
    }
    if let Ok(v) = std::env::var(ENV_SIMILARITY_THRESHOLD) {
        raw.pipeline.similarity_threshold =
            v.trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_SIMILARITY_THRESHOLD,
                    value: v.clone(),
                })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::defaults().unwrap();
        assert_eq!(cfg.pipeline.top_n, DEFAULT_TOP_N);
        assert_eq!(cfg.sources.len(), 7);
        assert_eq!(cfg.sources[0].provider, ProviderKind::Huggingface);
        let kinds: Vec<SourceKind> = cfg
            .sources
            .iter()
            .map(|s| s.resolved_kind().unwrap())
            .collect();
        assert_eq!(kinds[0], SourceKind::Academic);
        assert_eq!(kinds[6], SourceKind::Social);
        assert_eq!(
            cfg.pipeline.ranking.freshness_window,
            Duration::hours(DEFAULT_FRESHNESS_WINDOW_HOURS)
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
[pipeline]
top_n = 3
keywords = ["GPT"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.top_n, 3);
        assert_eq!(cfg.pipeline.keywords, vec!["GPT".to_string()]);
        assert!((cfg.pipeline.similarity_threshold - DEFAULT_SIMILARITY_THRESHOLD).abs() < 1e-12);
        assert_eq!(cfg.sources.len(), 7);
    }

    #[test]
    fn negative_top_n_rejected() {
        let err = AppConfig::from_toml_str("[pipeline]\ntop_n = -2").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTopN(-2)));
    }

    #[test]
    fn zero_window_rejected() {
        let err = AppConfig::from_toml_str("[pipeline]\nfreshness_window_hours = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFreshnessWindow(0)));
    }

    #[test]
    fn unknown_source_without_kind_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
[[sources]]
id = "my-blog"
name = "My Blog"
provider = "rss"
url = "https://blog.example/feed"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSource(id) if id == "my-blog"));
    }

    #[test]
    fn explicit_kind_resolves_unknown_id() {
        let cfg = AppConfig::from_toml_str(
            r#"
[[sources]]
id = "my-blog"
name = "My Blog"
provider = "rss"
kind = "social"
url = "https://blog.example/feed"
language = "en"
"#,
        )
        .unwrap();
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].resolved_kind().unwrap(), SourceKind::Social);
        assert_eq!(cfg.sources[0].language, Language::English);
    }

    #[serial_test::serial]
    #[test]
    fn env_override_is_validated() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("digest.toml");
        fs::write(&p, "[pipeline]\nsimilarity_threshold = 0.8").unwrap();

        env::set_var(ENV_SIMILARITY_THRESHOLD, "1.5");
        let err = AppConfig::load_from(&p).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOutOfRange(_)));

        env::set_var(ENV_SIMILARITY_THRESHOLD, "abc");
        let err = AppConfig::load_from(&p).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));

        env::set_var(ENV_SIMILARITY_THRESHOLD, "0.9");
        let cfg = AppConfig::load_from(&p).unwrap();
        assert!((cfg.pipeline.similarity_threshold - 0.9).abs() < 1e-12);
        env::remove_var(ENV_SIMILARITY_THRESHOLD);
    }
}
