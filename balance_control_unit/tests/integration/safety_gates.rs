//! Integration test: tip-over, saturation timeout, pause and exit gates.

use balance_common::control_unit::state::{ControlState, RunState};
use balance_control_unit::cycle::TickOutcome;
use balance_control_unit::state::lifecycle::LifecycleEvent;
use balance_control_unit::supervisor::DisengageReason;

use super::{Harness, proportional_d1, test_config};

// ── Tip-over ────────────────────────────────────────────────────────

#[test]
fn tilt_beyond_tip_angle_disengages_on_next_tick() {
    for tilt in [0.8501, 0.9, 1.2, -0.86, -1.5] {
        let mut h = Harness::running_at(test_config(), 0.0);
        h.engage();
        assert!(matches!(h.tick(0.0), TickOutcome::Driven { .. }));

        // one tick of estimator lag, then the gate fires
        assert!(matches!(h.tick(tilt), TickOutcome::Driven { .. }));
        match h.tick(tilt) {
            TickOutcome::Disengaged(DisengageReason::TipOver { tilt: seen }) => {
                assert!((seen - tilt).abs() < 1e-9);
            }
            other => panic!("tilt {tilt}: expected tip-over, got {other:?}"),
        }
        assert_eq!(h.shared.control_state(), ControlState::Disengaged);
        assert!(!h.rig.enabled());
        assert_eq!(*h.rig.duty.lock(), [0.0; 5]);
        assert_eq!(h.d1_output(), 0.0);
        assert_eq!(h.tick(tilt), TickOutcome::Idle);
    }
}

#[test]
fn tilt_just_inside_tip_angle_keeps_running() {
    let tip = test_config().safety.tip_angle - 1e-9;
    let mut h = Harness::running_at(test_config(), tip);
    h.engage();
    for _ in 0..5 {
        assert!(matches!(h.tick(tip), TickOutcome::Driven { .. }));
    }
    assert!(h.rig.enabled());
}

#[test]
fn tip_over_beats_any_loop_state() {
    // an aggressive D1 never gets to run
    let mut config = test_config();
    proportional_d1(&mut config, 100.0, 1.0);
    let mut h = Harness::running_at(config, 0.9);
    h.engage();
    assert!(matches!(
        h.tick(0.9),
        TickOutcome::Disengaged(DisengageReason::TipOver { .. })
    ));
}

// ── Saturation ──────────────────────────────────────────────────────

fn saturating_harness() -> Harness {
    // error -0.5 with k = 10 pins the command at -1 once the soft start is done
    let mut config = test_config();
    proportional_d1(&mut config, 10.0, 1.0);
    let mut h = Harness::running_at(config, 0.5);
    h.engage();
    // soft-start tick: command 0, not saturated
    assert!(matches!(h.tick(0.5), TickOutcome::Driven { .. }));
    h
}

#[test]
fn saturation_for_full_timeout_disengages_on_next_tick() {
    let mut h = saturating_harness();
    let limit = h.config.saturation_limit_ticks();
    assert_eq!(limit, 40);

    for k in 1..=limit {
        assert!(
            matches!(h.tick(0.5), TickOutcome::Driven { .. }),
            "saturated tick {k}"
        );
        assert_eq!(h.fast.saturation_latched(), k == limit, "after saturated tick {k}");
    }
    assert_eq!(
        h.tick(0.5),
        TickOutcome::Disengaged(DisengageReason::Saturation)
    );
    assert!(!h.rig.enabled());
    assert!(!h.fast.saturation_latched());
    assert_eq!(h.tick(0.5), TickOutcome::Idle);
}

#[test]
fn one_tick_short_of_timeout_keeps_running() {
    let mut h = saturating_harness();
    let limit = h.config.saturation_limit_ticks();

    for _ in 1..limit - 1 {
        h.tick(0.5);
    }
    // the estimate lags one tick: this is saturated tick limit - 1
    h.tick(0.0);
    assert!(!h.fast.saturation_latched());
    // zero error, streak broken one tick short
    for _ in 0..3 {
        assert!(matches!(h.tick(0.0), TickOutcome::Driven { .. }));
    }
    assert!(!h.fast.saturation_latched());
    assert_eq!(h.shared.control_state(), ControlState::Engaged);
}

#[test]
fn low_battery_raises_gain_into_saturation() {
    // k·e = 0.8 at nominal voltage; at 5.5 V compensation pushes it past 0.95
    let mut config = test_config();
    proportional_d1(&mut config, 4.0, 1.0);
    let mut h = Harness::running_at(config, -0.2);
    h.shared.update_orientation(|o| o.v_batt = 5.5);
    h.engage();
    h.tick(-0.2);
    h.tick(-0.2);
    let expected: f64 = 0.8 * 7.4 / 5.5;
    assert!(expected > 0.95);
    assert!((h.d1_output() - expected.min(1.0)).abs() < 1e-9);
}

// ── Lifecycle gates ─────────────────────────────────────────────────

#[test]
fn pause_disengages_and_resume_stays_disengaged() {
    let mut h = Harness::running_at(test_config(), 0.0);
    h.engage();
    assert!(matches!(h.tick(0.0), TickOutcome::Driven { .. }));

    h.shared.apply_lifecycle_event(LifecycleEvent::PauseToggle);
    assert_eq!(h.shared.run_state(), RunState::Paused);
    assert_eq!(
        h.tick(0.0),
        TickOutcome::Disengaged(DisengageReason::NotRunning)
    );
    assert!(!h.rig.enabled());
    assert_eq!(h.tick(0.0), TickOutcome::Idle);

    h.shared.apply_lifecycle_event(LifecycleEvent::PauseToggle);
    assert_eq!(h.shared.run_state(), RunState::Running);
    assert_eq!(h.tick(0.0), TickOutcome::Idle);
    assert_eq!(h.shared.control_state(), ControlState::Disengaged);
}

#[test]
fn exit_disables_motors_and_skips_loops() {
    let mut h = Harness::running_at(test_config(), 0.1);
    h.engage();
    h.tick(0.1);
    let before = h.d1_output();

    h.shared.apply_lifecycle_event(LifecycleEvent::Exit);
    for _ in 0..3 {
        assert_eq!(h.tick(0.1), TickOutcome::Exit);
    }
    assert!(!h.rig.enabled());
    assert_eq!(h.d1_output(), before);
}

#[test]
fn start_wait_aborts_on_exit_and_leaves_disengaged() {
    use balance_control_unit::safety::start::StartDetector;

    let h = Harness::running_at(test_config(), 0.7);
    let mut detector = StartDetector::new(&h.config.safety);
    let mut polls = 0;
    let result = h.supervisor.wait_for_start_condition(&mut detector, || {
        polls += 1;
        if polls == 3 {
            h.shared.apply_lifecycle_event(LifecycleEvent::Exit);
        }
    });
    assert!(result.is_err());
    assert_eq!(h.shared.control_state(), ControlState::Disengaged);
}
