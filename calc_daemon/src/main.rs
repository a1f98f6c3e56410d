//! # calgo daemon
//!
//! ```text
//! calc_daemon                          # listen on 127.0.0.1:8888
//! calc_daemon --config calgo.toml      # settings, variables, bind, log filter
//! calc_daemon --bind 0.0.0.0:9000
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use calc_core::CalcConfig;
use calc_daemon::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "calc_daemon", version, about = "calgo HTTP calculation service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides `[server] bind`
    #[arg(short, long)]
    bind: Option<String>,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CalcConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => CalcConfig::default(),
    };
    config.validate()?;
    init_tracing(&config.log.filter);

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let state = AppState::new(config.to_context());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!("calc_daemon listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}
