//! AI News Digest binary entrypoint
//! Loads configuration, wires sources/pipeline/mailer, and runs the digest
//! once or on a schedule.

use ai_news_digest::config::AppConfig;
use ai_news_digest::digest::{DigestService, RunMode};
use ai_news_digest::notify::subscribers;
use ai_news_digest::scheduler::{spawn_digest_scheduler, SchedulerCfg};
use ai_news_digest::telemetry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Daily AI news digest: fetch, filter, dedup, rank, mail.
#[derive(Parser, Debug)]
#[command(name = "ai-news-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collects AI news from several sources and mails a ranked daily digest")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (TOML). Defaults to $DIGEST_CONFIG_PATH, then config/digest.toml.
    #[arg(long, global = true, env = "DIGEST_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true, env = "DIGEST_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the digest on the configured interval (default)
    Run,

    /// Run the digest once and exit
    Once {
        /// Print the rendered digest instead of mailing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Add subscribers from `From:` header values
    Subscribe {
        /// e.g. "Jane Doe <jane@example.com>"
        #[arg(required = true)]
        from: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let cfg = match path {
        Some(p) => AppConfig::load_from(p),
        None => AppConfig::load_default(),
    };
    cfg.context("loading configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();
    if let Some(addr) = cli.metrics_addr {
        telemetry::init_metrics(addr)?;
    }

    let cfg = load_config(cli.config.as_ref())?;
    info!(
        sources = cfg.enabled_sources().count(),
        top_n = cfg.pipeline.top_n,
        threshold = cfg.pipeline.similarity_threshold,
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let interval = SchedulerCfg::from_hours(cfg.schedule.interval_hours);
            let service = Arc::new(DigestService::from_config(cfg)?);
            let handle = spawn_digest_scheduler(interval, service);
            tokio::select! {
                res = handle => {
                    if let Err(e) = res {
                        error!(error = %e, "scheduler task ended");
                    }
                }
                _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
            }
        }
        Commands::Once { dry_run } => {
            let service = DigestService::from_config(cfg)?;
            let mode = if dry_run { RunMode::DryRun } else { RunMode::Deliver };
            let report = service.run_once(mode, chrono::Utc::now()).await?;
            if dry_run {
                println!("Subject: {}\n", report.subject);
                print!("{}", report.text);
            }
            info!(
                fetched = report.fetched,
                selected = report.selection.selected,
                sent = report.delivery.as_ref().map_or(0, |d| d.sent),
                "done"
            );
        }
        Commands::Subscribe { from } => {
            let found: Vec<String> = from
                .iter()
                .filter_map(|h| {
                    let addr = subscribers::extract_address(h);
                    if addr.is_none() {
                        error!(header = %h, "no address found");
                    }
                    addr
                })
                .collect();
            let outcome = subscribers::merge(&cfg.email.subscribers_path, &found)?;
            println!("added {}, total {}", outcome.added, outcome.total);
        }
    }
    Ok(())
}
