//! Analyze a signed-in account's timeline through a running proxy.
//!
//! Usage:
//! ```bash
//! cargo run --bin clearpost-pipeline -- --user-id u123 \
//!   --cookie 'clearpost_session=...' --proxy-url http://localhost:3001/
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clearpost::logging::LoggingConfig;
use clearpost::pipeline::{
    HttpProxyApi, MemoryAnalysisStore, MergePolicy, Pipeline, PipelineConfig,
};
use clearpost::risk::{AnalyzedItem, RiskSummary, RiskTier};
use clearpost::PipelineError;
use url::Url;

#[derive(Clone, Copy, ValueEnum)]
enum Merge {
    Latest,
    PersistedIfLarger,
}

impl From<Merge> for MergePolicy {
    fn from(merge: Merge) -> Self {
        match merge {
            Merge::Latest => MergePolicy::LatestPerItem,
            Merge::PersistedIfLarger => MergePolicy::PersistedIfLarger,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "clearpost-pipeline",
    about = "Classify every tweet of the session's timeline and print a risk summary"
)]
struct PipelineArgs {
    /// Identity the analyses are recorded under
    #[arg(long)]
    user_id: String,

    /// `Cookie` header value of an authenticated proxy session
    #[arg(long, env = "CLEARPOST_COOKIE")]
    cookie: Option<String>,

    #[arg(long, env = "PROXY_URL", default_value = "http://localhost:3001/")]
    proxy_url: Url,

    /// Pause after each successful analysis, in milliseconds
    #[arg(long, env = "PIPELINE_DELAY_MS", default_value_t = 1500)]
    delay_ms: u64,

    #[arg(long, value_enum, default_value = "latest")]
    merge: Merge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = PipelineArgs::parse();
    LoggingConfig::from_env()
        .init()
        .context("failed to initialize logging")?;

    let mut proxy = HttpProxyApi::new(reqwest::Client::new(), args.proxy_url);
    if let Some(cookie) = args.cookie {
        proxy = proxy.with_cookie(cookie);
    }
    let config = PipelineConfig::default()
        .with_delay(Duration::from_millis(args.delay_ms))
        .with_merge(args.merge.into());
    let pipeline = Pipeline::new(Arc::new(proxy), Arc::new(MemoryAnalysisStore::new()))
        .with_config(config);

    match pipeline.run(&args.user_id).await {
        Ok(report) => {
            println!("@{} ({})", report.account.screen_name, report.account.id);
            print_items(&report.items, &report.summary);
            Ok(())
        }
        Err(PipelineError::FetchFailed { source, stored }) => {
            println!("stored analyses for {}", args.user_id);
            print_items(&stored, &RiskSummary::from_items(&stored));
            Err(anyhow::Error::new(*source).context("timeline fetch failed"))
        }
        Err(err) => Err(anyhow::Error::new(err).context("pipeline run failed")),
    }
}

fn print_items(items: &[AnalyzedItem], summary: &RiskSummary) {
    for item in items {
        println!("{:>8}  {:<24}  {}", item.risk_tier, item.item_id, item.reason);
    }
    println!();
    for tier in RiskTier::ALL {
        println!("{tier:>8}: {}", summary.count(tier));
    }
}
