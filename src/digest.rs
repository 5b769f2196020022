// src/digest.rs
//! One digest run: ingest → selection → translation → render → delivery.

use crate::config::AppConfig;
use crate::ingest::{self, providers, types::SourceProvider};
use crate::notify::{self, email::EmailSender, render, subscribers, DeliveryReport, Mailer};
use crate::pipeline::{SelectionPipeline, SelectionStats};
use crate::translate::{DigestEntry, TranslationConfig, Translator};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Deliver,
    /// Render only; nothing is sent.
    DryRun,
}

#[derive(Debug, Clone)]
pub struct DigestReport {
    pub fetched: usize,
    pub dropped: usize,
    pub failed_providers: usize,
    pub selection: SelectionStats,
    pub entries: Vec<DigestEntry>,
    pub subject: String,
    pub text: String,
    /// `None` for dry runs and empty selections.
    pub delivery: Option<DeliveryReport>,
}

pub struct DigestService {
    cfg: AppConfig,
    pipeline: SelectionPipeline,
    providers: Vec<Arc<dyn SourceProvider>>,
    translator: Translator,
    mailer: Option<Arc<dyn Mailer>>,
    email_to: String,
}

impl DigestService {
    pub fn new(
        cfg: AppConfig,
        providers: Vec<Arc<dyn SourceProvider>>,
        translator: Translator,
        mailer: Option<Arc<dyn Mailer>>,
        email_to: String,
    ) -> Result<Self> {
        let pipeline = SelectionPipeline::new(cfg.pipeline.clone())?;
        Ok(Self {
            cfg,
            pipeline,
            providers,
            translator,
            mailer,
            email_to,
        })
    }

    /// Wire everything from config + environment. Mail settings are optional
    /// here; a delivering run without them fails.
    pub fn from_config(cfg: AppConfig) -> Result<Self> {
        let providers = providers::build_all(cfg.enabled_sources(), &cfg.fetch)?;
        let translator = Translator::new(TranslationConfig::from_env())?;
        let (mailer, email_to): (Option<Arc<dyn Mailer>>, String) =
            match notify::email::EmailSettings::from_env() {
                Ok(settings) => {
                    let sender: Arc<dyn Mailer> = Arc::new(EmailSender::new(&settings)?);
                    (Some(sender), settings.to.clone())
                }
                Err(e) => {
                    tracing::warn!(target: "digest", error = %e, "email not configured");
                    (None, String::new())
                }
            };
        Self::new(cfg, providers, translator, mailer, email_to)
    }

    pub async fn run_once(&self, mode: RunMode, now: DateTime<Utc>) -> Result<DigestReport> {
        counter!("digest_runs_total").increment(1);

        let ingest = ingest::collect(&self.providers, &self.cfg.fetch, now).await;
        let fetched = ingest.items.len();
        let dropped = ingest.dropped;
        let failed_providers = ingest.failed_providers();

        let selection = self.pipeline.run(ingest.items, now);
        let stats = selection.stats;
        for r in &selection.items {
            tracing::debug!(
                target: "digest",
                id = %r.item.fingerprint(),
                total = r.score.total,
                recency = r.score.recency,
                source = r.score.source,
                social = r.score.social,
                cluster = r.cluster_size,
                "selected"
            );
        }

        let entries = self.translator.translate_all(selection.into_items()).await;

        let date = now.date_naive();
        let prefix = &self.cfg.email.subject_prefix;
        let subject = render::subject(prefix, date);
        let text = render::render_text(prefix, date, &entries);

        let delivery = if entries.is_empty() {
            tracing::warn!(target: "digest", "nothing selected, no digest sent");
            None
        } else if mode == RunMode::DryRun {
            None
        } else {
            let mailer = self
                .mailer
                .as_deref()
                .ok_or_else(|| anyhow!("email delivery requested but EMAIL_USER/EMAIL_PASSWORD are not set"))?;
            let subs = subscribers::load(&self.cfg.email.subscribers_path)?;
            let recipients = subscribers::recipients(&self.email_to, &subs);
            if recipients.is_empty() {
                return Err(anyhow!("no recipients: EMAIL_TO is empty and the subscriber file has none"));
            }
            let html = render::render_html(prefix, date, &entries);
            let report = notify::deliver(mailer, &recipients, &subject, &text, &html).await;
            if report.sent == 0 {
                return Err(anyhow!(
                    "{subject}: delivery failed for all {} recipients",
                    recipients.len()
                ));
            }
            Some(report)
        };

        gauge!("digest_last_success_ts").set(now.timestamp() as f64);
        tracing::info!(
            target: "digest",
            fetched,
            dropped,
            failed_providers,
            selected = stats.selected,
            dry_run = mode == RunMode::DryRun,
            sent = delivery.as_ref().map_or(0, |d| d.sent),
            "digest run done"
        );

        Ok(DigestReport {
            fetched,
            dropped,
            failed_providers,
            selection: stats,
            entries,
            subject,
            text,
            delivery,
        })
    }
}
