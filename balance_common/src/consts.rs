//! System-wide constants for the balance workspace.
//!
//! Single source of truth for default rates, limits and physical constants.
//! The `edumip` preset is built from these values.

/// Maximum number of taps (numerator or denominator) in any controller.
pub const MAX_FILTER_TAPS: usize = 8;

/// Inner loop (D1/D3) and IMU sample rate [Hz].
pub const SAMPLE_RATE_D1_HZ: u32 = 100;

/// Outer loop (D2) rate [Hz].
pub const SAMPLE_RATE_D2_HZ: u32 = 20;

/// Battery sampler rate [Hz].
pub const BATTERY_CHECK_HZ: u32 = 5;

/// Setpoint manager (start detection) rate [Hz].
pub const SETPOINT_MANAGER_HZ: u32 = 100;

/// Console status reporter rate [Hz].
pub const STATUS_HZ: u32 = 50;

/// Button/LED panel polling rate [Hz].
pub const PANEL_HZ: u32 = 50;

/// Start-condition polling rate [Hz].
pub const START_CHECK_HZ: u32 = 20;

/// Normalized duty limit accepted by the motor sink.
pub const DUTY_LIMIT: f64 = 1.0;

/// D1 output magnitude counted as saturated.
pub const SATURATION_THRESHOLD: f64 = 0.95;

/// Nominal pack voltage [V].
pub const V_NOMINAL: f64 = 7.4;

/// Lowest plausible pack voltage [V].
pub const V_MIN_PLAUSIBLE: f64 = 5.0;

/// Highest plausible pack voltage [V].
pub const V_MAX_PLAUSIBLE: f64 = 9.0;

/// Button hold time that requests shutdown [s].
pub const LONG_PRESS_TIME_S: f64 = 2.0;

/// IMU settle time before the first RUNNING transition [s].
pub const IMU_SETTLE_TIME_S: f64 = 2.5;

/// Degrees to radians.
pub const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
