//! MotionController: all lanes of one machine

use std::sync::Arc;

use rf_core::{GameConfig, Money};
use rf_event::GameEvent;

use crate::lane::{Lane, LaneStop};
use crate::outcome::SpinOutcome;
use crate::params::MotionParams;

pub struct MotionController {
    params: Arc<MotionParams>,
    lanes: Vec<Lane>,
    /// Payline symbol of each lane since the last spin
    paylines: Vec<Option<String>>,
    /// A spin was started and has not been scored yet
    pending: bool,
    stake: Option<Money>,
}

impl MotionController {
    pub fn new(params: MotionParams) -> Self {
        let params = Arc::new(params);
        let lanes = (0..params.lane_count)
            .map(|i| Lane::new(i, Arc::clone(&params)))
            .collect();
        Self {
            paylines: vec![None; params.lane_count],
            params,
            lanes,
            pending: false,
            stake: None,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(MotionParams::from(config))
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Lanes are independent; callers may tick them on separate threads.
    pub fn lanes_mut(&mut self) -> &mut [Lane] {
        &mut self.lanes
    }

    /// Request a spin on every lane. Returns how many lanes started.
    ///
    /// Lanes still busy keep their current payline for scoring.
    pub fn request_spin(&mut self) -> usize {
        let mut started = 0;
        for (lane, payline) in self.lanes.iter_mut().zip(&mut self.paylines) {
            if lane.spin_requested() {
                *payline = None;
                started += 1;
            }
        }
        if started > 0 {
            self.pending = true;
            self.stake = None;
        }
        started
    }

    /// React to a bus event. Only buys start a spin; the buy amount becomes
    /// the stake of the resulting [`SpinOutcome`].
    pub fn handle_event(&mut self, event: &GameEvent) -> usize {
        let GameEvent::Buy(buy) = event else {
            return 0;
        };
        let started = self.request_spin();
        if started > 0 {
            self.stake = Some(buy.amount);
        }
        started
    }

    /// Advance every lane by `dt` seconds and collect the lanes that stopped.
    pub fn tick(&mut self, dt: f64) -> Vec<LaneStop> {
        let stops: Vec<LaneStop> = self.lanes.iter_mut().filter_map(|lane| lane.tick(dt)).collect();
        for stop in &stops {
            if let Some(slot) = self.paylines.get_mut(stop.lane) {
                *slot = stop.payline().map(str::to_string);
            }
        }
        stops
    }

    /// Score the last spin once every lane has come to rest.
    ///
    /// Returns each spin's outcome exactly once.
    pub fn take_outcome(&mut self) -> Option<SpinOutcome> {
        if !self.pending {
            return None;
        }
        let symbols: Option<Vec<String>> = self.paylines.iter().cloned().collect();
        let outcome = SpinOutcome::evaluate(symbols?, &self.params.payout_table, self.stake)?;

        self.pending = false;
        log::debug!(
            "[Motion] Spin scored: {} x{} -> multiplier {}",
            outcome.best_symbol,
            outcome.matches,
            outcome.multiplier
        );
        Some(outcome)
    }

    /// True when no lane is spinning, braking or aligning
    pub fn is_settled(&self) -> bool {
        self.lanes
            .iter()
            .all(|lane| lane.state().is_idle() || lane.state().is_stopped())
    }

    /// Ticks needed for the slowest lane to stop after a spin request
    pub fn settle_tick_bound(&self, dt: f64) -> usize {
        self.lanes
            .iter()
            .map(|lane| lane.settle_tick_bound(dt))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> MotionController {
        MotionController::new(MotionParams {
            seed: Some(9),
            ..MotionParams::default()
        })
    }

    #[test]
    fn test_lane_count() {
        let ctl = controller();
        assert_eq!(ctl.lanes().len(), 5);
        assert!(ctl.is_settled());
    }

    #[test]
    fn test_only_buys_spin() {
        let mut ctl = controller();
        assert_eq!(ctl.handle_event(&GameEvent::Tick { t: 1 }), 0);
        assert!(ctl.is_settled());

        let buy: GameEvent = serde_json::from_str(
            r#"{"type":"buy","contributorId":"x","amount":1}"#,
        )
        .unwrap();
        assert_eq!(ctl.handle_event(&buy), 5);
        assert!(!ctl.is_settled());
        assert_eq!(ctl.handle_event(&buy), 0);
    }

    fn buy(amount: f64) -> GameEvent {
        serde_json::from_value(serde_json::json!({
            "type": "buy", "contributorId": "x", "amount": amount
        }))
        .unwrap()
    }

    fn settle(ctl: &mut MotionController) -> Vec<LaneStop> {
        let dt = 1.0 / 60.0;
        let mut stops = Vec::new();
        for _ in 0..ctl.settle_tick_bound(dt) {
            stops.extend(ctl.tick(dt));
            if stops.len() == ctl.lanes().len() {
                break;
            }
        }
        stops
    }

    #[test]
    fn test_outcome_scores_settled_paylines() {
        let mut ctl = controller();
        assert!(ctl.take_outcome().is_none());

        assert_eq!(ctl.handle_event(&buy(10.0)), 5);
        let mut stops = settle(&mut ctl);
        stops.sort_by_key(|s| s.lane);
        let paylines: Vec<String> = stops
            .iter()
            .map(|s| s.payline().unwrap().to_string())
            .collect();

        let outcome = ctl.take_outcome().expect("every lane settled");
        assert_eq!(outcome.symbols, paylines);
        assert_eq!(outcome.stake, Some(10.0));
        let best = paylines.iter().filter(|s| **s == outcome.best_symbol).count();
        assert_eq!(outcome.matches, best);
        let expected = ctl.params().payout_table.get(&best).copied().unwrap_or(0.0);
        assert_eq!(outcome.multiplier, expected);

        // Scored once per spin.
        assert!(ctl.take_outcome().is_none());
    }

    #[test]
    fn test_no_outcome_before_all_lanes_stop() {
        let mut ctl = controller();
        ctl.request_spin();
        for _ in 0..10 {
            ctl.tick(1.0 / 60.0);
        }
        assert!(ctl.take_outcome().is_none());

        settle(&mut ctl);
        let outcome = ctl.take_outcome().unwrap();
        assert_eq!(outcome.symbols.len(), 5);
        assert_eq!(outcome.stake, None);
    }

    #[test]
    fn test_every_lane_stops_once() {
        let mut ctl = controller();
        let dt = 1.0 / 60.0;
        ctl.request_spin();

        let mut order = Vec::new();
        for _ in 0..ctl.settle_tick_bound(dt) {
            order.extend(ctl.tick(dt).into_iter().map(|s| s.lane));
            if order.len() == 5 {
                break;
            }
        }
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(ctl.is_settled());
    }
}
