//! OAuth 1.0a proxy server.
//!
//! Usage:
//! ```bash
//! TWITTER_CONSUMER_KEY=... TWITTER_CONSUMER_SECRET=... \
//! TWITTER_CALLBACK_URL=http://localhost:3001/callback \
//! FRONTEND_ORIGIN=http://localhost:3000 CLASSIFIER_API_TOKEN=hf_... \
//!   cargo run --bin clearpost-proxy -- --port 3001
//! ```

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use clearpost::logging::LoggingConfig;
use clearpost::{server, ProxyConfig};

#[derive(Parser)]
#[command(
    name = "clearpost-proxy",
    about = "Twitter OAuth 1.0a proxy with toxicity classification",
    long_about = "Runs the handshake for browser sessions and forwards signed timeline reads \
                  and classification calls upstream. Configuration comes from the environment."
)]
struct ProxyArgs {
    /// Port override (`PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Allow the session cookie over plain http
    #[arg(long)]
    insecure_cookies: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = ProxyArgs::parse();
    LoggingConfig::from_env()
        .init()
        .context("failed to initialize logging")?;

    let mut config = ProxyConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        let ip = config.bind_addr().ip();
        config = config.with_bind_addr(SocketAddr::new(ip, port));
    }
    if args.insecure_cookies {
        let cookies = config.cookies().clone().with_secure(false);
        config = config.with_cookies(cookies);
    }

    server::serve(config).await.context("proxy stopped")?;
    Ok(())
}
