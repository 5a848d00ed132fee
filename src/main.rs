//! morning-digest: one run of the daily digest, meant to be scheduled by cron
//! or a systemd timer.
//!
//! Exit codes: 0 delivered, 1 delivery failed, 2 bad configuration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use morning_digest::config::DigestConfig;
use morning_digest::http::HttpTransport;
use morning_digest::notify::{Notifier, StdoutNotifier, TelegramNotifier};
use morning_digest::telemetry::{init_tracing, LogFormat};
use morning_digest::{DigestPipeline, RunContext};

#[derive(Debug, Parser)]
#[command(name = "morning-digest", version, about = "Compose and send the morning digest")]
struct Cli {
    /// Print the digest to stdout instead of sending it.
    #[arg(long)]
    dry_run: bool,

    /// Load environment from this file instead of `.env`.
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Digest date (YYYY-MM-DD); defaults to today, local time.
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A missing .env is fine; an explicit --env-file must exist.
    let env_loaded = match &cli.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| ()),
        None => dotenvy::dotenv().map(|_| ()).or_else(|e| {
            if e.not_found() {
                Ok(())
            } else {
                Err(e)
            }
        }),
    };

    init_tracing(LogFormat::from_env());

    if let Err(e) = env_loaded {
        error!(error = %e, "could not load environment file");
        return ExitCode::from(2);
    }

    let cfg = match DigestConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(2);
        }
    };

    // Never log secrets, only their presence.
    info!(
        bot_token_len = cfg.bot_token.len(),
        weather_key_len = cfg.weather_key.len(),
        city = %cfg.city_query,
        sign = %cfg.zodiac_sign,
        outlets = cfg.news_outlets.len(),
        dry_run = cli.dry_run,
        "config loaded"
    );

    let ctx = cli.date.map(RunContext::new).unwrap_or_else(RunContext::today);

    match run(&cfg, &ctx, cli.dry_run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("run failed: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cfg: &DigestConfig, ctx: &RunContext, dry_run: bool) -> anyhow::Result<()> {
    let transport = HttpTransport::new(cfg.request_timeout).context("building http client")?;

    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(StdoutNotifier)
    } else {
        Box::new(
            TelegramNotifier::new(cfg.bot_token.clone(), cfg.chat_id.clone())
                .with_api_base(cfg.endpoints.telegram.clone())
                .with_timeout(cfg.request_timeout),
        )
    };

    let pipeline = DigestPipeline::from_config(cfg, Arc::new(transport), notifier);
    let report = pipeline.run(ctx).await?;
    info!(date = %ctx.date, degraded = ?report.degraded, "digest delivered");
    Ok(())
}
