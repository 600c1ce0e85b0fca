//! Shared rig for the integration tests.

mod config_files;
mod end_to_end;
mod engage_cycle;
mod loops;
mod safety_gates;
mod simulation;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use balance_common::control_unit::config::{BalanceConfig, FilterCoefficients};
use balance_common::hal::driver::{Encoders, Motors};
use balance_common::hal::types::ImuSample;
use balance_control_unit::cycle::{FastLoop, TickOutcome};
use balance_control_unit::state::lifecycle::LifecycleEvent;
use balance_control_unit::state::shared::SharedState;
use balance_control_unit::supervisor::Supervisor;
use parking_lot::Mutex;

pub const G: f64 = 9.80665;

/// Motor and encoder stand-in. Channels are 1-based, index 0 unused.
#[derive(Default)]
pub struct Rig {
    pub duty: Mutex<[f64; 5]>,
    pub ticks: Mutex<[i64; 5]>,
    pub enabled: AtomicBool,
}

impl Rig {
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn duty(&self, channel: u8) -> f64 {
        self.duty.lock()[channel as usize]
    }
}

impl Motors for Rig {
    fn set_duty(&self, channel: u8, duty: f64) {
        self.duty.lock()[channel as usize] = duty;
    }
    fn set_all(&self, duty: f64) {
        *self.duty.lock() = [duty; 5];
    }
    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }
    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }
}

impl Encoders for Rig {
    fn position(&self, channel: u8) -> i64 {
        self.ticks.lock()[channel as usize]
    }
    fn set_position(&self, channel: u8, value: i64) {
        self.ticks.lock()[channel as usize] = value;
    }
}

/// Level mount and `w·dt = 1`: the estimated tilt is the previous sample's
/// tilt exactly.
pub fn test_config() -> BalanceConfig {
    let mut config = BalanceConfig::default();
    config.mechanics.mount_angle = 0.0;
    config.estimator.filter_w = 100.0;
    config
}

/// D1 reduced to `u = k·e`, full soft start after `1/step` ticks.
pub fn proportional_d1(config: &mut BalanceConfig, k: f64, soft_start_step: f64) {
    config.inner.filter = FilterCoefficients::new(k, &[1.0], &[1.0]);
    config.inner.soft_start_step = soft_start_step;
}

/// IMU sample of a body at rest at `tilt`.
pub fn imu_for_tilt(tilt: f64, mount_angle: f64) -> ImuSample {
    let a = tilt - mount_angle;
    ImuSample::new([0.0, G * a.cos(), -G * a.sin()], [0.0; 3])
}

/// Fast loop plus supervisor over a [`Rig`].
pub struct Harness {
    pub config: BalanceConfig,
    pub shared: Arc<SharedState>,
    pub supervisor: Arc<Supervisor>,
    pub rig: Arc<Rig>,
    pub fast: FastLoop,
}

impl Harness {
    pub fn new(config: BalanceConfig) -> Self {
        let shared = Arc::new(SharedState::new());
        let rig = Arc::new(Rig::default());
        let supervisor = Arc::new(Supervisor::new(
            &config,
            Arc::clone(&shared),
            rig.clone(),
            rig.clone(),
        ));
        let fast = FastLoop::new(
            &config,
            Arc::clone(&shared),
            Arc::clone(&supervisor),
            rig.clone(),
            rig.clone(),
        );
        Self {
            config,
            shared,
            supervisor,
            rig,
            fast,
        }
    }

    /// RUNNING, disengaged, estimate settled at `tilt`.
    pub fn running_at(config: BalanceConfig, tilt: f64) -> Self {
        let mut h = Self::new(config);
        h.shared.apply_lifecycle_event(LifecycleEvent::InitComplete);
        h.tick(tilt);
        h.tick(tilt);
        h
    }

    pub fn tick(&mut self, tilt: f64) -> TickOutcome {
        let sample = imu_for_tilt(tilt, self.config.mechanics.mount_angle);
        self.fast.tick(&sample)
    }

    pub fn engage(&self) -> u64 {
        self.supervisor.engage()
    }

    pub fn d1_output(&self) -> f64 {
        self.shared.orientation().d1_output
    }
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tol {tol})"
    );
}
