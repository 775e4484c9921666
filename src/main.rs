//! NETCONF configuration agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  NETCONF AGENT                   │
//!                        │                                                  │
//!   Client RPC (JSON)    │  ┌────────┐   ┌────────────┐   ┌──────────────┐  │
//!   ─────────────────────┼─▶│  http  │──▶│    rpc     │──▶│     edit     │  │
//!                        │  │ server │   │ dispatcher │   │   applier    │  │
//!                        │  └────────┘   └─────┬──────┘   └──────┬───────┘  │
//!                        │                     │                 │          │
//!                        │             ┌───────┼────────┐        ▼          │
//!                        │             ▼       ▼        ▼   ┌──────────┐    │
//!                        │         ┌──────┐ ┌──────┐ ┌──────┐│ validate │    │
//!                        │         │ lock │ │filter│ │datast││ (schema) │    │
//!                        │         │ mgr  │ │ eval │ │ ores ││          │    │
//!                        │         └──────┘ └──────┘ └──────┘└──────────┘    │
//!                        │                                                  │
//!                        │  config · observability · lifecycle · session    │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use netconf_agent::config::{load_config, AgentConfig};
use netconf_agent::lifecycle::startup;
use netconf_agent::observability::logging;

#[derive(Parser)]
#[command(name = "netconf-agent")]
#[command(about = "NETCONF configuration agent over HTTP/JSON", long_about = None)]
struct Args {
    /// Path to the agent configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("netconf-agent v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        max_sessions = config.sessions.max_sessions,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
