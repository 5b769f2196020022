// src/translate.rs
//! Title/summary translation through the Google Translate v2 REST API.
//!
//! Runs after selection, one call per text. Any failure leaves the translation
//! empty; the digest then shows the original text only.

use crate::item::{Language, NewsItem};
use anyhow::{Context, Result};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";
pub const DEFAULT_TARGET_LANGUAGE: &str = "zh-CN";

const ENV_API_KEY: &str = "GOOGLE_TRANSLATE_API_KEY";
const ENV_ENABLED: &str = "TRANSLATION_ENABLED";

#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub target_language: String,
    pub endpoint: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            target_language: DEFAULT_TARGET_LANGUAGE.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
        }
    }
}

impl TranslationConfig {
    /// `TRANSLATION_ENABLED` defaults to true; without an API key nothing is translated.
    pub fn from_env() -> Self {
        let enabled = std::env::var(ENV_ENABLED)
            .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
            .unwrap_or(true);
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            enabled,
            api_key,
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

/// A selected item plus its optional translation. The item itself is never touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestEntry {
    pub item: NewsItem,
    pub translated_title: Option<String>,
    pub translated_summary: Option<String>,
}

impl DigestEntry {
    pub fn untranslated(item: NewsItem) -> Self {
        Self {
            item,
            translated_title: None,
            translated_summary: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct Translator {
    cfg: TranslationConfig,
    client: Option<reqwest::Client>,
}

impl Translator {
    pub fn new(cfg: TranslationConfig) -> Result<Self> {
        let client = if cfg.is_configured() {
            Some(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(15))
                    .build()
                    .context("building translate client")?,
            )
        } else {
            tracing::warn!(target: "digest", "translation not configured, passing items through");
            None
        };
        Ok(Self { cfg, client })
    }

    /// Translator that never calls out.
    pub fn disabled() -> Self {
        Self {
            cfg: TranslationConfig::default(),
            client: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.client.is_some()
    }

    /// Translate the selection in order, one item at a time.
    pub async fn translate_all(&self, items: Vec<NewsItem>) -> Vec<DigestEntry> {
        let mut out = Vec::with_capacity(items.len());
        let (mut translated, mut skipped) = (0usize, 0usize);
        for item in items {
            if !self.is_active() || skip_translation(&item) {
                skipped += 1;
                out.push(DigestEntry::untranslated(item));
                continue;
            }
            let translated_title = self.translate_text(&item.title).await;
            let translated_summary = match item.summary.as_deref() {
                Some(s) => self.translate_text(s).await,
                None => None,
            };
            if translated_title.is_some() || translated_summary.is_some() {
                translated += 1;
            }
            out.push(DigestEntry {
                item,
                translated_title,
                translated_summary,
            });
        }
        tracing::info!(target: "digest", translated, skipped, "translation done");
        out
    }

    /// `None` on empty input, already-Chinese text, or any API failure.
    pub async fn translate_text(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() || is_mostly_chinese(text) {
            return None;
        }
        let client = self.client.as_ref()?;
        match self.call(client, text).await {
            Ok(t) if !t.trim().is_empty() => Some(t),
            Ok(_) => None,
            Err(e) => {
                counter!("translate_errors_total").increment(1);
                tracing::warn!(target: "digest", error = %format!("{e:#}"), "translation failed");
                None
            }
        }
    }

    async fn call(&self, client: &reqwest::Client, text: &str) -> Result<String> {
        let key = self.cfg.api_key.as_deref().unwrap_or_default();
        let resp: TranslateResponse = client
            .post(&self.cfg.endpoint)
            .query(&[("key", key)])
            .json(&TranslateRequest {
                q: text,
                target: &self.cfg.target_language,
                format: "text",
            })
            .send()
            .await
            .context("translate request")?
            .error_for_status()
            .context("translate status")?
            .json()
            .await
            .context("translate decode")?;
        let first = resp
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .unwrap_or_default();
        Ok(html_escape::decode_html_entities(&first).into_owned())
    }
}

/// Chinese-language items, and items whose title is mostly Han, are shown as-is.
pub fn skip_translation(item: &NewsItem) -> bool {
    item.language == Language::Chinese || is_mostly_chinese(&item.title)
}

/// More than half of the word characters are CJK ideographs.
pub fn is_mostly_chinese(text: &str) -> bool {
    static RE_HAN: OnceCell<Regex> = OnceCell::new();
    static RE_WORD: OnceCell<Regex> = OnceCell::new();
    let han = RE_HAN
        .get_or_init(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("han regex"))
        .find_iter(text)
        .count();
    let word = RE_WORD
        .get_or_init(|| Regex::new(r"\w").expect("word regex"))
        .find_iter(text)
        .count();
    word > 0 && han * 2 > word
}
