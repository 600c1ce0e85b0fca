//! Inner stabilization loop (D1).
//!
//! Drives the tilt error to zero. Output is battery-compensated, ramped in by
//! a soft start after every engage and watched for sustained saturation.

use balance_common::consts::DUTY_LIMIT;
use balance_common::control_unit::config::BalanceConfig;

use super::filters::IirFilter;
use crate::safety::saturation::SaturationMonitor;

/// Result of one D1 step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InnerOutput {
    /// Clamped, soft-start-scaled drive command in [-1, 1].
    pub command: f64,
    /// Soft-start multiplier applied this tick.
    pub soft_start: f64,
    /// Saturation timeout reached; the supervisor must disengage.
    pub saturation_fault: bool,
}

// ─── Soft Start ─────────────────────────────────────────────────────

/// Linear 0 → 1 ramp applied to the D1 output after engage.
#[derive(Debug, Clone, Copy)]
pub struct SoftStart {
    step: f64,
    ticks: u32,
}

impl SoftStart {
    pub const fn new(step: f64) -> Self {
        Self { step, ticks: 0 }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.ticks = 0;
    }

    /// Current multiplier: `min(ticks · step, 1)`.
    #[inline]
    pub fn value(&self) -> f64 {
        (f64::from(self.ticks) * self.step).min(1.0)
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.value() < 1.0 {
            self.ticks += 1;
        }
    }

    /// Ticks from reset until the multiplier reaches 1.
    pub fn ticks_to_full(&self) -> u32 {
        (1.0 / self.step).ceil() as u32
    }
}

// ─── D1 ─────────────────────────────────────────────────────────────

/// D1 controller state.
#[derive(Debug, Clone)]
pub struct InnerLoop {
    filter: IirFilter,
    soft_start: SoftStart,
    saturation: SaturationMonitor,
    v_nominal: f64,
}

impl InnerLoop {
    pub fn new(config: &BalanceConfig) -> Self {
        Self {
            filter: IirFilter::from_coefficients(&config.inner.filter),
            soft_start: SoftStart::new(config.inner.soft_start_step),
            saturation: SaturationMonitor::new(
                config.inner.saturation_threshold,
                config.saturation_limit_ticks(),
            ),
            v_nominal: config.battery.v_nominal,
        }
    }

    /// Clear filter history, restart the soft start and the saturation count.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.soft_start.reset();
        self.saturation.reset();
    }

    /// One D1 tick. `v_batt` must already be a plausible voltage.
    pub fn step(&mut self, setpoint_tilt: f64, tilt: f64, v_batt: f64) -> InnerOutput {
        let error = setpoint_tilt - tilt;
        let gain = self.filter.gain() * self.v_nominal / v_batt;
        let raw = self.filter.march_with_gain(error, gain);

        let soft_start = self.soft_start.value();
        let command = (raw * soft_start).clamp(-DUTY_LIMIT, DUTY_LIMIT);
        self.soft_start.advance();

        InnerOutput {
            command,
            soft_start,
            saturation_fault: self.saturation.observe(command),
        }
    }

    #[inline]
    pub fn saturation(&self) -> &SaturationMonitor {
        &self.saturation
    }
}
