//! Integration test: engage, soft start and history reset across re-engage.

use balance_common::control_unit::config::FilterCoefficients;
use balance_common::control_unit::state::ControlState;
use balance_control_unit::cycle::TickOutcome;
use balance_control_unit::supervisor::DisengageReason;

use super::{Harness, assert_close, proportional_d1, test_config};

#[test]
fn disengaged_ticks_do_not_drive() {
    let mut h = Harness::running_at(test_config(), 0.1);
    for _ in 0..10 {
        assert_eq!(h.tick(0.1), TickOutcome::Idle);
    }
    assert!(!h.rig.enabled());
    assert_eq!(h.d1_output(), 0.0);
    assert_close(h.shared.orientation().tilt, 0.1, 1e-9);
}

#[test]
fn soft_start_ramps_command_after_engage() {
    let mut config = test_config();
    proportional_d1(&mut config, 1.0, 0.25);
    let mut h = Harness::running_at(config, 0.2);
    h.engage();
    assert!(h.rig.enabled());

    let expected = [0.0, -0.05, -0.1, -0.15, -0.2, -0.2, -0.2];
    for want in expected {
        match h.tick(0.2) {
            TickOutcome::Driven { left, right } => {
                // left polarity +1, right polarity -1, no heading error
                assert_close(left, want, 1e-9);
                assert_close(right, -want, 1e-9);
            }
            other => panic!("expected drive, got {other:?}"),
        }
        assert_close(h.d1_output(), want, 1e-9);
    }
    let wiring = &h.config.wiring;
    assert_close(h.rig.duty(wiring.motor_channel_l), -0.2, 1e-9);
    assert_close(h.rig.duty(wiring.motor_channel_r), 0.2, 1e-9);
}

#[test]
fn soft_start_multiplier_is_monotonic_and_capped() {
    let mut config = test_config();
    proportional_d1(&mut config, 0.5, 1.0 / 70.0);
    let mut h = Harness::running_at(config, 0.4);
    h.engage();

    let mut previous = 0.0_f64;
    for k in 0..100 {
        h.tick(0.4);
        let magnitude = h.d1_output().abs();
        if k == 0 {
            assert_eq!(magnitude, 0.0);
        }
        assert!(magnitude + 1e-12 >= previous, "tick {k}: {magnitude} < {previous}");
        assert!(magnitude <= 0.2 + 1e-12);
        previous = magnitude;
    }
    assert_close(previous, 0.2, 1e-9);
}

#[test]
fn re_engage_restarts_soft_start_and_clears_history() {
    // D1 as a pure accumulator: w[k] = e[k] + w[k-1]
    let mut config = test_config();
    config.inner.filter = FilterCoefficients::new(1.0, &[1.0, 0.0], &[1.0, -1.0]);
    config.inner.soft_start_step = 1.0;
    let mut h = Harness::running_at(config, 0.01);

    h.engage();
    for _ in 0..10 {
        h.tick(0.01);
    }
    assert_close(h.d1_output(), -0.1, 1e-9);

    h.supervisor.disengage(DisengageReason::NotRunning);
    assert_eq!(h.tick(0.01), TickOutcome::Idle);
    let epoch = h.engage();
    assert_eq!(epoch, 2);

    h.tick(0.01);
    assert_eq!(h.d1_output(), 0.0);
    h.tick(0.01);
    // history restarted from zero: two accumulated errors, not twelve
    assert_close(h.d1_output(), -0.02, 1e-9);
}

#[test]
fn engage_while_engaged_resets_without_idle_tick() {
    let mut config = test_config();
    config.inner.filter = FilterCoefficients::new(1.0, &[1.0, 0.0], &[1.0, -1.0]);
    config.inner.soft_start_step = 1.0;
    let mut h = Harness::running_at(config, 0.01);

    h.engage();
    for _ in 0..5 {
        h.tick(0.01);
    }
    h.engage();
    h.tick(0.01);
    assert_eq!(h.d1_output(), 0.0);
    h.tick(0.01);
    assert_close(h.d1_output(), -0.02, 1e-9);
    assert_eq!(h.shared.control_state(), ControlState::Engaged);
}

#[test]
fn engage_zeroes_encoder_origin() {
    let mut h = Harness::running_at(test_config(), 0.0);
    {
        let mut ticks = h.rig.ticks.lock();
        ticks[h.config.wiring.encoder_channel_l as usize] = 500;
        ticks[h.config.wiring.encoder_channel_r as usize] = -500;
    }
    h.tick(0.0);
    assert!(h.shared.orientation().progression > 0.0);

    h.engage();
    h.tick(0.0);
    let o = h.shared.orientation();
    assert_eq!(o.wheel_angle_l, 0.0);
    assert_eq!(o.wheel_angle_r, 0.0);
    assert_close(o.progression, 0.0, 1e-12);
}
