//! Every lane settles exactly on target within its tick bound

use std::sync::Arc;

use proptest::prelude::*;
use rf_motion::{Lane, MotionParams, MotionState};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lane_settles_within_bound(
        seed in any::<u64>(),
        index in 0usize..5,
        fps in 20u32..=240,
        drift_ticks in 0usize..200,
    ) {
        let params = Arc::new(MotionParams {
            seed: Some(seed),
            ..MotionParams::default()
        });
        let dt = 1.0 / fps as f64;
        let mut lane = Lane::new(index, params);

        // Start from an arbitrary idle position.
        for _ in 0..drift_ticks {
            lane.tick(dt);
        }

        prop_assert!(lane.spin_requested());
        let bound = lane.settle_tick_bound(dt);

        let mut stopped = None;
        for n in 1..=bound {
            prop_assert!(!lane.spin_requested());
            if lane.tick(dt).is_some() {
                stopped = Some(n);
                break;
            }
        }
        prop_assert!(stopped.is_some(), "not stopped after {} ticks", bound);

        match lane.state() {
            MotionState::Stopped { rest_offset, .. } => {
                prop_assert!(lane.strip().iter().any(|s| s.offset == rest_offset));
            }
            other => prop_assert!(false, "unexpected state {:?}", other),
        }

        let cycle = 270.0;
        for s in lane.strip() {
            prop_assert!((0.0..cycle).contains(&s.offset));
        }
    }
}
