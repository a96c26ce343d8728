//! `reelfire serve`

use std::sync::Arc;

use anyhow::{Context, Result};
use rf_connector::{serve_http, serve_tcp, shutdown_channel};
use rf_core::GameConfig;
use rf_engine::{GameEngine, MockFeed, MockSettings, TokioClock};
use tokio::net::TcpListener;

pub async fn run(config: GameConfig) -> Result<()> {
    let engine = GameEngine::spawn(&config, Arc::new(TokioClock::new()))?;
    let (trigger, shutdown) = shutdown_channel();

    let http = TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("binding HTTP on {}", config.http_addr))?;
    let tcp = TcpListener::bind(&config.tcp_addr)
        .await
        .with_context(|| format!("binding TCP on {}", config.tcp_addr))?;

    let http_task = tokio::spawn(serve_http(http, engine.clone(), shutdown.clone()));
    let tcp_task = tokio::spawn(serve_tcp(tcp, engine.clone(), shutdown));

    let mock = config.mock.then(|| {
        log::info!("[Serve] Mock feed enabled");
        MockFeed::new(MockSettings::from(&config)).spawn(engine.clone())
    });

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    log::info!("[Serve] Shutting down");

    trigger.trigger();
    engine.shutdown().await;
    if let Some(mock) = mock {
        mock.abort();
    }

    http_task.await??;
    tcp_task.await??;
    Ok(())
}
