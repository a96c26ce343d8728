//! End-to-end engine behaviour on a paused tokio clock

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use rf_core::{GameConfig, RfError};
use rf_engine::{EngineHandle, GameEngine, MockFeed, MockSettings, TokioClock};
use rf_event::{GameEvent, Subscription};
use serde_json::json;

fn config() -> GameConfig {
    GameConfig {
        interval_cap_minutes: 2,
        ..GameConfig::default()
    }
}

fn start(config: &GameConfig) -> EngineHandle {
    GameEngine::spawn(config, Arc::new(TokioClock::starting_at(0))).unwrap()
}

async fn next_event(sub: &mut Subscription) -> Arc<GameEvent> {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(600), sub.recv())
            .await
            .expect("no event")
            .expect("bus closed");
        if !matches!(*event, GameEvent::Tick { .. }) {
            return event;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_submit_publishes_event_then_snapshot() {
    let engine = start(&config());
    let mut sub = engine.subscribe();

    let returned = engine
        .submit_json(json!({ "type": "buy", "contributorId": "7xKq", "amount": 100 }))
        .await
        .unwrap();

    match &*next_event(&mut sub).await {
        GameEvent::Buy(ev) => assert_eq!(ev.contributor_id, "7xKq"),
        other => panic!("expected buy, got {other:?}"),
    }
    let snapshot = next_event(&mut sub).await;
    assert_eq!(snapshot.as_state(), Some(&returned));
    assert_eq!(engine.state(), returned);

    assert_relative_eq!(returned.pool_balance, 1.0);
    assert_relative_eq!(returned.owner_balance, 2.0);
    assert_relative_eq!(returned.total_value, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_large_contribution_extends_interval() {
    let engine = start(&config());

    let state = engine
        .submit_json(json!({ "type": "buy", "contributorId": "whale", "amount": 25_000 }))
        .await
        .unwrap();
    assert_eq!(state.payout_interval_ms, 142_000);
    assert_eq!(state.next_payout_at, engine.now_ms() + 142_000);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_submission_changes_nothing() {
    let engine = start(&config());
    let mut sub = engine.subscribe();
    let before = engine.state();

    let err = engine
        .submit_json(json!({ "type": "buy", "contributorId": "x", "amount": -5 }))
        .await
        .unwrap_err();
    assert!(matches!(err, RfError::Validation(_)));
    assert_eq!(engine.state(), before);
    assert!(sub.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_payout_fires_for_last_contributor() {
    let engine = start(&config());
    let mut sub = engine.subscribe();

    // 5000 * 0.02 = 100 owner balance, interval stays at the 22 s base.
    engine
        .submit_json(json!({ "type": "buy", "contributorId": "alice", "amount": 5_000 }))
        .await
        .unwrap();
    next_event(&mut sub).await;
    let after_buy = next_event(&mut sub).await.as_state().cloned().unwrap();
    assert_eq!(after_buy.payout_interval_ms, 22_000);

    match &*next_event(&mut sub).await {
        GameEvent::Win(win) => {
            assert_eq!(win.winner_id, "alice");
            assert_relative_eq!(win.suggested_payout, 50.0);
        }
        other => panic!("expected win, got {other:?}"),
    }
    let after_win = next_event(&mut sub).await.as_state().cloned().unwrap();
    assert_relative_eq!(after_win.owner_balance, 50.0);
    assert!(after_win.next_payout_at >= after_buy.next_payout_at + 22_000);
    assert!(engine.now_ms() >= after_buy.next_payout_at);
}

#[tokio::test(start_paused = true)]
async fn test_empty_game_just_reschedules() {
    let engine = start(&config());
    let mut sub = engine.subscribe();
    let initial = engine.state();

    let event = next_event(&mut sub).await;
    let state = event.as_state().expect("expected a snapshot, not a win");
    assert!(state.last_contributor.is_none());
    assert!(state.next_payout_at >= initial.next_payout_at + 22_000);
}

#[tokio::test(start_paused = true)]
async fn test_new_deadline_replaces_old_timer() {
    let engine = start(&config());
    let mut sub = engine.subscribe();

    // Deadline moves from 22 s to 142 s; the 22 s timer must not pay out.
    engine
        .submit_json(json!({ "type": "buy", "contributorId": "whale", "amount": 25_000 }))
        .await
        .unwrap();
    next_event(&mut sub).await;
    next_event(&mut sub).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    while let Some(event) = sub.try_recv() {
        assert!(
            matches!(*event, GameEvent::Tick { .. }),
            "unexpected {:?} before the new deadline",
            event.kind()
        );
    }

    assert!(matches!(*next_event(&mut sub).await, GameEvent::Win(_)));
    assert!(engine.now_ms() >= 142_000);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_ticks() {
    let engine = start(&config());
    let mut sub = engine.subscribe();

    let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    match *event {
        GameEvent::Tick { t } => assert!(t >= 3_000),
        ref other => panic!("expected tick, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_engine() {
    let engine = start(&config());
    engine.shutdown().await;

    let err = engine
        .submit_json(json!({ "type": "buy", "contributorId": "x", "amount": 1 }))
        .await
        .unwrap_err();
    assert!(matches!(err, RfError::EngineClosed));
    assert!(!engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_mock_feed_drives_engine() {
    let engine = start(&config());
    let mut sub = engine.subscribe();
    let feed = MockFeed::new(MockSettings {
        seed: Some(1),
        ..MockSettings::default()
    })
    .spawn(engine.clone());

    assert!(matches!(*next_event(&mut sub).await, GameEvent::Buy(_)));
    assert!(next_event(&mut sub).await.as_state().is_some());

    engine.shutdown().await;
    tokio::time::timeout(Duration::from_secs(60), feed)
        .await
        .unwrap()
        .unwrap();
}

#[test]
fn test_invalid_config_rejected() {
    let config = GameConfig {
        decay_factor: 1.5,
        ..GameConfig::default()
    };
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();
    assert!(matches!(
        GameEngine::spawn(&config, Arc::new(TokioClock::starting_at(0))),
        Err(RfError::Config(_))
    ));
}
