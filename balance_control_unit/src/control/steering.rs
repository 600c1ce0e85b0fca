//! Steering loop (D3) and wheel command mixing.

use balance_common::consts::DUTY_LIMIT;
use balance_common::control_unit::config::{BalanceConfig, WiringConfig};

use super::filters::IirFilter;

/// D3: keeps the heading on its setpoint with a clamped differential term.
#[derive(Debug, Clone)]
pub struct SteeringLoop {
    filter: IirFilter,
    max_input: f64,
}

impl SteeringLoop {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            filter: IirFilter::from_coefficients(&config.steering.filter),
            max_input: config.steering.max_input,
        }
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Correction in `[-max_input, max_input]`.
    pub fn step(&mut self, setpoint_heading: f64, heading: f64) -> f64 {
        self.filter
            .march(setpoint_heading - heading)
            .clamp(-self.max_input, self.max_input)
    }
}

/// Mix drive and correction into per-wheel duties, polarity applied.
///
/// Returns `(left, right)`, each clamped to the duty limit.
pub fn wheel_commands(drive: f64, correction: f64, wiring: &WiringConfig) -> (f64, f64) {
    let left = (drive - correction) * f64::from(wiring.motor_polarity_l);
    let right = (drive + correction) * f64::from(wiring.motor_polarity_r);
    (
        left.clamp(-DUTY_LIMIT, DUTY_LIMIT),
        right.clamp(-DUTY_LIMIT, DUTY_LIMIT),
    )
}
