//! Outer position loop (D2).
//!
//! Runs in its own slower context. It turns the progression error into a
//! tilt setpoint and hands it to D1 through the shared setpoint record.

use balance_common::control_unit::config::BalanceConfig;
use tracing::debug;

use super::filters::IirFilter;
use crate::state::shared::SharedState;

/// D2 controller state.
#[derive(Debug, Clone)]
pub struct OuterLoop {
    filter: IirFilter,
    theta_ref_max: f64,
}

impl OuterLoop {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            filter: IirFilter::from_coefficients(&config.outer.filter),
            theta_ref_max: config.outer.theta_ref_max,
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Tilt setpoint in `[-theta_ref_max, theta_ref_max]`.
    pub fn step(&mut self, setpoint_progression: f64, progression: f64) -> f64 {
        self.filter
            .march(setpoint_progression - progression)
            .clamp(-self.theta_ref_max, self.theta_ref_max)
    }
}

/// D2 bound to the shared state, one instance per outer context.
#[derive(Debug, Clone)]
pub struct OuterLoopTask {
    outer: OuterLoop,
    epoch: u64,
}

impl OuterLoopTask {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            outer: OuterLoop::new(config),
            epoch: 0,
        }
    }

    /// One outer-loop period. Returns the tilt setpoint written, if any.
    ///
    /// Nothing is written while disengaged, and a result computed across an
    /// engage (epoch changed under us) is dropped.
    pub fn run_once(&mut self, shared: &SharedState) -> Option<f64> {
        let sp = shared.setpoint();
        if !sp.control.is_engaged() {
            return None;
        }
        if sp.engage_epoch != self.epoch {
            self.outer.reset();
            self.epoch = sp.engage_epoch;
            debug!(epoch = self.epoch, "D2 history cleared");
        }

        let progression = shared.orientation().progression;
        let tilt_ref = self.outer.step(sp.progression, progression);

        let mut current = shared.lock_setpoint();
        if current.engage_epoch == self.epoch && current.control.is_engaged() {
            current.tilt = tilt_ref;
            Some(tilt_ref)
        } else {
            None
        }
    }
}
