//! Mock submission feed for demos and local development
//!
//! Submits a random buy every `buy_every` and a random sell every
//! `sell_every` through the normal engine path, so viewers see exactly what a
//! live feed would produce.

use std::time::Duration;

use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rf_core::{GameConfig, RfError};
use rf_event::Submission;
use rf_state::{ContributionEvent, WithdrawalEvent};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::EngineHandle;

const DISPLAY_NAMES: &[&str] = &["degen", "whale", "paperhands", "anon", "ser"];

#[derive(Debug, Clone)]
pub struct MockSettings {
    pub buy_every: Duration,
    pub sell_every: Duration,
    /// Buy amount range (inclusive lower, exclusive upper)
    pub buy_amount: (f64, f64),
    pub sell_amount: (f64, f64),
    pub seed: Option<u64>,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            buy_every: Duration::from_secs(10),
            sell_every: Duration::from_secs(17),
            buy_amount: (10.0, 50.0),
            sell_amount: (5.0, 55.0),
            seed: None,
        }
    }
}

impl From<&GameConfig> for MockSettings {
    fn from(config: &GameConfig) -> Self {
        Self {
            seed: config.seed,
            ..Self::default()
        }
    }
}

pub struct MockFeed {
    rng: StdRng,
    settings: MockSettings,
    counter: u64,
}

impl MockFeed {
    pub fn new(settings: MockSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            settings,
            counter: 0,
        }
    }

    /// Run the feed against `engine` until the engine stops.
    pub fn spawn(self, engine: EngineHandle) -> JoinHandle<()> {
        tokio::spawn(self.run(engine))
    }

    async fn run(mut self, engine: EngineHandle) {
        log::info!(
            "[Mock] Feeding buys every {:?} and sells every {:?}",
            self.settings.buy_every,
            self.settings.sell_every
        );

        let start = tokio::time::Instant::now();
        let mut buys = tokio::time::interval_at(start + self.settings.buy_every, self.settings.buy_every);
        let mut sells = tokio::time::interval_at(start + self.settings.sell_every, self.settings.sell_every);
        buys.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sells.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let submission = tokio::select! {
                _ = buys.tick() => self.next_buy(),
                _ = sells.tick() => self.next_sell(),
            };

            match engine.submit(submission).await {
                Ok(_) => {}
                Err(RfError::EngineClosed) => {
                    log::info!("[Mock] Engine closed, stopping");
                    break;
                }
                Err(e) => log::warn!("[Mock] Submission rejected: {}", e),
            }
        }
    }

    pub fn next_buy(&mut self) -> Submission {
        let (lo, hi) = self.settings.buy_amount;
        let amount = round_cents(self.rng.random_range(lo..hi));
        let name = DISPLAY_NAMES[self.rng.random_range(0..DISPLAY_NAMES.len())];

        Submission::Buy(ContributionEvent {
            contributor_id: self.wallet(),
            display_name: Some(name.to_string()),
            amount,
            source_ref: Some(self.source_ref()),
        })
    }

    pub fn next_sell(&mut self) -> Submission {
        let (lo, hi) = self.settings.sell_amount;
        let amount = round_cents(self.rng.random_range(lo..hi));

        Submission::Sell(WithdrawalEvent {
            contributor_id: self.wallet(),
            amount,
            source_ref: Some(self.source_ref()),
        })
    }

    fn wallet(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(6)
            .map(char::from)
            .collect()
    }

    fn source_ref(&mut self) -> String {
        self.counter += 1;
        format!("mock-{}", self.counter)
    }
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
