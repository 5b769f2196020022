// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// The only error class that aborts a selection run. Raised while loading
/// configuration or constructing the pipeline, before any item is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("keyword vocabulary is empty")]
    EmptyVocabulary,

    #[error("invalid keyword `{keyword}`: {source}")]
    InvalidKeyword {
        keyword: String,
        #[source]
        source: regex::Error,
    },

    #[error("top_n must be a positive integer, got {0}")]
    InvalidTopN(i64),

    #[error("similarity threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("freshness window must be positive, got {0}h")]
    InvalidFreshnessWindow(i64),

    #[error("`{name}` must be a finite, non-negative number, got {value}")]
    InvalidWeight { name: String, value: f64 },

    #[error("`{name}` must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("unknown source kind for `{0}`; set `kind` explicitly")]
    UnknownSource(String),

    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv { name: &'static str, value: String },

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("reading config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
}
