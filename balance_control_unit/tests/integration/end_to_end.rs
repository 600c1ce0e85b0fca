//! Integration test: a held-upright run at 100 Hz with the default loops.

use balance_common::control_unit::state::ControlState;
use balance_control_unit::control::outer::OuterLoopTask;
use balance_control_unit::cycle::TickOutcome;

use super::{Harness, test_config};

#[test]
fn small_tilt_oscillation_stays_engaged_and_in_clamps() {
    let mut h = Harness::running_at(test_config(), 0.0);
    let mut outer = OuterLoopTask::new(&h.config);
    let decimation = h.config.rates.fast_hz / h.config.rates.outer_hz;
    let max_steer = h.config.steering.max_input;
    let epoch = h.engage();

    for k in 0..200u32 {
        let tilt = if k % 2 == 0 { 0.01 } else { -0.01 };
        match h.tick(tilt) {
            TickOutcome::Driven { left, right } => {
                assert!(left.abs() <= 1.0 && right.abs() <= 1.0, "tick {k}");
            }
            other => panic!("tick {k}: expected drive, got {other:?}"),
        }
        if k % decimation == 0 {
            outer.run_once(&h.shared);
        }

        let o = h.shared.orientation();
        assert!(o.d3_output.abs() <= max_steer);
        assert!(o.d1_output.abs() < h.config.inner.saturation_threshold, "tick {k}");
        let sp = h.shared.setpoint();
        assert!(sp.tilt.abs() <= h.config.outer.theta_ref_max);
        assert_eq!(sp.control, ControlState::Engaged);
        assert_eq!(sp.engage_epoch, epoch);
    }
    assert!(h.rig.enabled());
}
