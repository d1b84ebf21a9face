//! fcb-daemon entry point.
//!
//! Intentionally thin: parse arguments, set up tracing, load the layered
//! configuration, wire the member, start the engine, and serve the HTTP
//! surface until ctrl-c. Route handlers live in `routes.rs`, shared state
//! in `state.rs`, member assembly in `wiring.rs`.

use anyhow::Context;
use clap::Parser;
use fcb_daemon::{routes, state, wiring};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "fcb-daemon", about = "Federated cloud broker member daemon")]
struct Args {
    /// Configuration documents, merged in order (later files override).
    #[arg(long = "config", value_name = "PATH")]
    config: Vec<String>,

    /// Override the configured listen address.
    #[arg(long = "listen", value_name = "ADDR")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    let args = Args::parse();

    let paths: Vec<&str> = args.config.iter().map(String::as_str).collect();
    let loaded = fcb_config::load_yaml_files(&paths).context("configuration load failed")?;
    info!(
        member = %loaded.config.local_member_id,
        config_hash = %loaded.config_hash,
        "configuration loaded"
    );

    let member = wiring::build_member(&loaded.config)?;
    let engine = member.engine.start();

    let shared = state::AppState::new(
        member.member_id.clone(),
        member.facade.clone(),
        member.remote_facade.clone(),
        member.registry.clone(),
        loaded.config_hash.clone(),
    );
    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr: SocketAddr = args
        .listen
        .unwrap_or_else(|| loaded.config.listen_addr.clone())
        .parse()
        .context("invalid listen address")?;
    info!("fcb-daemon listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    // Drain the processors before exiting.
    engine.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("ctrl-c handler failed; shutting down");
    }
    info!("shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
