//! `reelfire watch`: terminal viewer
//!
//! Follows the push feed and drives a local [`MotionController`]: every buy
//! spins the reels, each lane prints its symbols when it comes to rest, and
//! the settled payline is scored against the payout table.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use rf_connector::{ConnectionState, ConnectorBuilder};
use rf_core::{GameConfig, unix_ms};
use rf_event::GameEvent;
use rf_motion::MotionController;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

pub enum Target {
    Tcp(String),
    WebSocket(String),
}

pub async fn run(config: GameConfig, target: Target, fps: u32) -> Result<()> {
    if fps == 0 {
        bail!("--fps must be at least 1");
    }

    let mut connector = match &target {
        Target::Tcp(addr) => {
            let (host, port) = addr
                .rsplit_once(':')
                .context("TCP address must be host:port")?;
            let port: u16 = port.parse().context("invalid TCP port")?;
            ConnectorBuilder::tcp(host, port).build()
        }
        Target::WebSocket(url) => ConnectorBuilder::websocket(url).build(),
    };

    let mut events = connector.subscribe_events();
    connector.connect().await?;
    log::info!("[Watch] Connected");

    let mut motion = MotionController::from_config(&config);
    let dt = 1.0 / fps as f64;
    let mut frames = tokio::time::interval(Duration::from_secs_f64(dt));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut liveness = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            _ = frames.tick() => {
                for stop in motion.tick(dt) {
                    println!("  reel {} -> {}", stop.lane + 1, stop.symbols.join(" | "));
                }
                if let Some(outcome) = motion.take_outcome() {
                    let reward = outcome
                        .reward()
                        .map(|r| format!(" = {r:.2}"))
                        .unwrap_or_default();
                    println!(
                        "  {} x{} -> multiplier {}{}{}",
                        outcome.best_symbol,
                        outcome.matches,
                        outcome.multiplier,
                        reward,
                        if outcome.is_win() { "  WIN" } else { "" }
                    );
                }
            }

            event = events.recv() => match event {
                Ok(event) => show(&mut motion, &event),
                Err(RecvError::Lagged(n)) => log::warn!("[Watch] Skipped {} events", n),
                Err(RecvError::Closed) => break,
            },

            _ = liveness.tick() => {
                if matches!(
                    connector.state().await,
                    ConnectionState::Disconnected | ConnectionState::Error
                ) {
                    log::warn!("[Watch] Connection closed");
                    break;
                }
            }
        }
    }

    connector.disconnect().await;
    Ok(())
}

fn show(motion: &mut MotionController, event: &GameEvent) {
    match event {
        GameEvent::State { state } => println!(
            "pool {:.2} | total {:.2} | owner {:.2} | next payout in {}s",
            state.pool_balance,
            state.total_value,
            state.owner_balance,
            state.remaining_ms(unix_ms()) / 1000
        ),
        GameEvent::Buy(buy) => {
            let who = buy.display_name.as_deref().unwrap_or(&buy.contributor_id);
            println!("BUY  {} +{:.2}", who, buy.amount);
            if motion.handle_event(event) == 0 {
                log::debug!("[Watch] Reels still busy, spin skipped");
            }
        }
        GameEvent::Sell(sell) => println!("SELL {} -{:.2}", sell.contributor_id, sell.amount),
        GameEvent::Win(win) => println!(
            "*** JACKPOT *** {} wins {:.2}",
            win.winner_id, win.suggested_payout
        ),
        GameEvent::Tick { .. } => {}
    }
}
