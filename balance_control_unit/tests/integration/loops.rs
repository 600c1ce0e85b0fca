//! Integration test: D2 → D1 setpoint handoff and D3 differential drive.

use balance_common::control_unit::config::FilterCoefficients;
use balance_control_unit::control::outer::OuterLoopTask;
use balance_control_unit::cycle::TickOutcome;
use balance_control_unit::supervisor::DisengageReason;

use super::{Harness, assert_close, proportional_d1, test_config};

fn set_ticks(h: &Harness, left: i64, right: i64) {
    let mut ticks = h.rig.ticks.lock();
    ticks[h.config.wiring.encoder_channel_l as usize] = left;
    ticks[h.config.wiring.encoder_channel_r as usize] = right;
}

#[test]
fn outer_loop_tilt_setpoint_reaches_inner_loop() {
    let mut config = test_config();
    proportional_d1(&mut config, 1.0, 1.0);
    config.outer.filter = FilterCoefficients::new(0.1, &[1.0], &[1.0]);
    let mut h = Harness::running_at(config, 0.0);
    let mut outer = OuterLoopTask::new(&h.config);

    h.engage();
    h.tick(0.0);

    // both wheels rolled forward: same angle, no heading
    set_ticks(&h, 200, -200);
    h.tick(0.0);
    let progression = h.shared.orientation().progression;
    assert!(progression > 0.5);
    assert_eq!(h.shared.orientation().heading, 0.0);

    let tilt_ref = outer.run_once(&h.shared).expect("engaged");
    assert_close(tilt_ref, (-0.1 * progression).max(-0.33), 1e-12);
    assert_eq!(h.shared.setpoint().tilt, tilt_ref);

    match h.tick(0.0) {
        TickOutcome::Driven { left, right } => {
            assert_close(left, tilt_ref, 1e-12);
            assert_close(right, -tilt_ref, 1e-12);
        }
        other => panic!("expected drive, got {other:?}"),
    }
    assert_close(h.d1_output(), tilt_ref, 1e-12);
}

#[test]
fn outer_loop_is_clamped_and_idle_when_disengaged() {
    let mut config = test_config();
    config.outer.filter = FilterCoefficients::new(0.1, &[1.0], &[1.0]);
    let mut h = Harness::running_at(config, 0.0);
    let mut outer = OuterLoopTask::new(&h.config);

    h.engage();
    set_ticks(&h, 2000, -2000);
    h.tick(0.0);
    assert_eq!(outer.run_once(&h.shared), Some(-0.33));

    h.supervisor.disengage(DisengageReason::NotRunning);
    assert_eq!(outer.run_once(&h.shared), None);

    // re-engage zeroes the reference before D2 runs again
    h.engage();
    assert_eq!(h.shared.setpoint().tilt, 0.0);
}

#[test]
fn heading_error_splits_across_wheels() {
    let mut config = test_config();
    proportional_d1(&mut config, 1.0, 1.0);
    let mut h = Harness::running_at(config, 0.0);

    h.engage();
    h.tick(0.0);
    // right wheel ahead: positive heading, negative correction
    set_ticks(&h, 0, -200);
    let (left, right) = match h.tick(0.0) {
        TickOutcome::Driven { left, right } => (left, right),
        other => panic!("expected drive, got {other:?}"),
    };
    let o = h.shared.orientation();
    assert!(o.heading > 0.0);
    let correction = o.d3_output;
    assert_close(correction, -h.config.steering.max_input, 1e-12);
    assert_close(o.d1_output, 0.0, 1e-12);
    // left = (drive - c)·(+1), right = (drive + c)·(-1)
    assert_close(left, -correction, 1e-12);
    assert_close(right, -correction, 1e-12);
}
