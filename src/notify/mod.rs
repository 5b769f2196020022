// src/notify/mod.rs
pub mod email;
pub mod render;
pub mod subscribers;

use anyhow::Result;
use metrics::counter;

/// Sends one rendered digest to one recipient.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: Vec<String>,
}

/// One message per recipient; a failure is logged and counted, the rest still go out.
pub async fn deliver(
    mailer: &dyn Mailer,
    recipients: &[String],
    subject: &str,
    text: &str,
    html: &str,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for to in recipients {
        match mailer.send(to, subject, text, html).await {
            Ok(()) => {
                report.sent += 1;
                counter!("notify_sent_total").increment(1);
            }
            Err(e) => {
                tracing::warn!(target: "notify", recipient = %to, error = %format!("{e:#}"), "send failed");
                counter!("notify_failed_total").increment(1);
                report.failed.push(to.clone());
            }
        }
    }
    tracing::info!(target: "notify", sent = report.sent, failed = report.failed.len(), "delivery done");
    report
}
