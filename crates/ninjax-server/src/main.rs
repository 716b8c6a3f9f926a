use ninjax_core::logging;

mod ratelimit;
mod routes;
mod state;

use anyhow::{Context, Result};
use ninjax_core::artifact::sweep::{run_sweeper, SweepTier};
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // As early as possible; degrades to stderr when the state dir is
    // unwritable.
    logging::init();

    if let Err(err) = run().await {
        eprintln!("ninjax error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cfg = ninjax_core::config::load_or_init().context("loading configuration")?;
    let state = state::AppState::build(cfg).context("building server state")?;

    // Reclamation runs eagerly once, then on its fixed interval,
    // independent of request traffic.
    let tiers = vec![
        SweepTier {
            dir: state.artifacts.root().to_path_buf(),
            max_age: Duration::from_secs(state.cfg.retention.download_secs),
        },
        SweepTier {
            dir: state.temp_dir.clone(),
            max_age: Duration::from_secs(state.cfg.retention.temp_secs),
        },
    ];
    let sweeper = tokio::spawn(run_sweeper(
        tiers,
        Duration::from_secs(state.cfg.retention.sweep_interval_secs),
    ));

    let bind = state.cfg.effective_bind();
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "ninjax gateway listening");

    let app = routes::router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await
    .context("server error")?;

    sweeper.abort();
    Ok(())
}
