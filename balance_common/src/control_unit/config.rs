//! Configuration schema for the balance controller.
//!
//! All types use `serde::Deserialize` for TOML loading. Every section and
//! every field carries a default taken from the `edumip` preset, so a file
//! only lists what differs from the reference robot. The configuration is
//! immutable once the scheduler starts.
//!
//! Hardware variants are expressed as named [`Preset`]s rather than as
//! forked code paths.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consts::{
    BATTERY_CHECK_HZ, IMU_SETTLE_TIME_S, LONG_PRESS_TIME_S, MAX_FILTER_TAPS, PANEL_HZ,
    SAMPLE_RATE_D1_HZ, SAMPLE_RATE_D2_HZ, SATURATION_THRESHOLD, SETPOINT_MANAGER_HZ,
    START_CHECK_HZ, STATUS_HZ, V_MAX_PLAUSIBLE, V_MIN_PLAUSIBLE, V_NOMINAL,
};

/// Fixed-capacity tap sequence (numerator or denominator).
pub type Coefficients = heapless::Vec<f64, MAX_FILTER_TAPS>;

/// Build a [`Coefficients`] from a slice, truncating at capacity.
pub fn taps(values: &[f64]) -> Coefficients {
    values.iter().copied().take(MAX_FILTER_TAPS).collect()
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BalanceConfig {
    pub rates: RateConfig,
    pub mechanics: MechanicsConfig,
    pub wiring: WiringConfig,
    pub estimator: EstimatorConfig,
    pub inner: InnerLoopConfig,
    pub outer: OuterLoopConfig,
    pub steering: SteeringConfig,
    pub safety: SafetyConfig,
    pub battery: BatteryConfig,
    pub button: ButtonConfig,
    pub priorities: PriorityConfig,
}

impl BalanceConfig {
    /// Validate parameter bounds and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rates.validate()?;
        self.mechanics.validate()?;
        self.wiring.validate()?;
        self.estimator.validate(self.rates.fast_dt())?;
        self.inner.validate()?;
        self.outer.validate()?;
        self.steering.validate()?;
        self.safety.validate()?;
        self.battery.validate()?;
        self.button.validate()?;
        if self.saturation_limit_ticks() < 1 {
            return Err(invalid(format!(
                "inner.saturation_timeout {} s is shorter than one tick at {} Hz",
                self.inner.saturation_timeout, self.rates.fast_hz
            )));
        }
        Ok(())
    }

    /// Consecutive saturated D1 ticks that trip the saturation fault.
    pub fn saturation_limit_ticks(&self) -> u32 {
        (self.rates.fast_hz as f64 * self.inner.saturation_timeout).round() as u32
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

fn require_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

// ─── Rates ──────────────────────────────────────────────────────────

/// Execution-context rates [Hz].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// IMU sample rate; drives estimator, D1 and D3.
    pub fast_hz: u32,
    /// Outer position loop (D2).
    pub outer_hz: u32,
    pub battery_hz: u32,
    pub setpoint_manager_hz: u32,
    pub status_hz: u32,
    /// Button polling and LED refresh.
    pub panel_hz: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            fast_hz: SAMPLE_RATE_D1_HZ,
            outer_hz: SAMPLE_RATE_D2_HZ,
            battery_hz: BATTERY_CHECK_HZ,
            setpoint_manager_hz: SETPOINT_MANAGER_HZ,
            status_hz: STATUS_HZ,
            panel_hz: PANEL_HZ,
        }
    }
}

impl RateConfig {
    /// Fast-loop sample interval [s].
    #[inline]
    pub fn fast_dt(&self) -> f64 {
        1.0 / self.fast_hz as f64
    }

    /// Outer-loop sample interval [s].
    #[inline]
    pub fn outer_dt(&self) -> f64 {
        1.0 / self.outer_hz as f64
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, hz) in [
            ("rates.fast_hz", self.fast_hz),
            ("rates.outer_hz", self.outer_hz),
            ("rates.battery_hz", self.battery_hz),
            ("rates.setpoint_manager_hz", self.setpoint_manager_hz),
            ("rates.status_hz", self.status_hz),
            ("rates.panel_hz", self.panel_hz),
        ] {
            if hz == 0 || hz > 10_000 {
                return Err(invalid(format!("{name} {hz} out of range [1, 10000]")));
            }
        }
        if self.outer_hz > self.fast_hz {
            return Err(invalid(format!(
                "rates.outer_hz {} must not exceed rates.fast_hz {}",
                self.outer_hz, self.fast_hz
            )));
        }
        Ok(())
    }
}

// ─── Mechanics ──────────────────────────────────────────────────────

/// Physical constants of the chassis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicsConfig {
    /// IMU mounting offset added to the fused tilt [rad].
    pub mount_angle: f64,
    /// Motor-to-wheel gearbox ratio.
    pub gearbox: f64,
    /// Encoder counts per motor-shaft revolution.
    pub encoder_res: f64,
    pub wheel_radius_m: f64,
    pub track_width_m: f64,
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            mount_angle: 0.29,
            gearbox: 35.57,
            encoder_res: 60.0,
            wheel_radius_m: 0.034,
            track_width_m: 0.035,
        }
    }
}

impl MechanicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.mount_angle.is_finite() || self.mount_angle.abs() > core::f64::consts::FRAC_PI_2 {
            return Err(invalid(format!(
                "mechanics.mount_angle {} out of range [-pi/2, pi/2]",
                self.mount_angle
            )));
        }
        require_positive("mechanics.gearbox", self.gearbox)?;
        require_positive("mechanics.encoder_res", self.encoder_res)?;
        require_positive("mechanics.wheel_radius_m", self.wheel_radius_m)?;
        require_positive("mechanics.track_width_m", self.track_width_m)?;
        Ok(())
    }
}

// ─── Wiring ─────────────────────────────────────────────────────────

/// Motor/encoder channel mapping and polarity per wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    pub motor_channel_l: u8,
    pub motor_channel_r: u8,
    pub motor_polarity_l: i8,
    pub motor_polarity_r: i8,
    pub encoder_channel_l: u8,
    pub encoder_channel_r: u8,
    pub encoder_polarity_l: i8,
    pub encoder_polarity_r: i8,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            motor_channel_l: 3,
            motor_channel_r: 2,
            motor_polarity_l: 1,
            motor_polarity_r: -1,
            encoder_channel_l: 3,
            encoder_channel_r: 2,
            encoder_polarity_l: 1,
            encoder_polarity_r: -1,
        }
    }
}

impl WiringConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, p) in [
            ("wiring.motor_polarity_l", self.motor_polarity_l),
            ("wiring.motor_polarity_r", self.motor_polarity_r),
            ("wiring.encoder_polarity_l", self.encoder_polarity_l),
            ("wiring.encoder_polarity_r", self.encoder_polarity_r),
        ] {
            if p != 1 && p != -1 {
                return Err(invalid(format!("{name} must be 1 or -1, got {p}")));
            }
        }
        if self.motor_channel_l == self.motor_channel_r {
            return Err(invalid(format!(
                "wiring: left and right motors share channel {}",
                self.motor_channel_l
            )));
        }
        if self.encoder_channel_l == self.encoder_channel_r {
            return Err(invalid(format!(
                "wiring: left and right encoders share channel {}",
                self.encoder_channel_l
            )));
        }
        Ok(())
    }
}

// ─── Estimator ──────────────────────────────────────────────────────

/// Complementary filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Crossover frequency `w` [rad/s]; the pole sits at `1 - w·dt`.
    pub filter_w: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self { filter_w: 0.66 }
    }
}

impl EstimatorConfig {
    fn validate(&self, dt: f64) -> Result<(), ConfigError> {
        require_positive("estimator.filter_w", self.filter_w)?;
        let w_dt = self.filter_w * dt;
        if w_dt > 1.0 {
            return Err(invalid(format!(
                "estimator.filter_w * dt = {w_dt} must not exceed 1"
            )));
        }
        Ok(())
    }
}

// ─── Controllers ────────────────────────────────────────────────────

/// Discrete transfer function `gain · num(z⁻¹) / den(z⁻¹)`.
///
/// `den[0]` is the unity leading term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCoefficients {
    pub gain: f64,
    pub num: Coefficients,
    pub den: Coefficients,
}

impl FilterCoefficients {
    pub fn new(gain: f64, num: &[f64], den: &[f64]) -> Self {
        Self {
            gain,
            num: taps(num),
            den: taps(den),
        }
    }

    /// Filter order (number of denominator taps minus one).
    #[inline]
    pub fn order(&self) -> usize {
        self.den.len().saturating_sub(1)
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !self.gain.is_finite() {
            return Err(invalid(format!("{name}.gain must be finite")));
        }
        if self.num.is_empty() || self.den.is_empty() {
            return Err(invalid(format!("{name}: num and den must not be empty")));
        }
        if self.num.len() != self.den.len() {
            return Err(invalid(format!(
                "{name}: num has {} taps but den has {}",
                self.num.len(),
                self.den.len()
            )));
        }
        if (self.den[0] - 1.0).abs() > 1e-9 {
            return Err(invalid(format!(
                "{name}: leading denominator tap must be 1, got {}",
                self.den[0]
            )));
        }
        if self.num.iter().chain(self.den.iter()).any(|c| !c.is_finite()) {
            return Err(invalid(format!("{name}: coefficients must be finite")));
        }
        Ok(())
    }
}

/// Inner stabilization loop (D1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerLoopConfig {
    pub filter: FilterCoefficients,
    /// Sustained saturation before the loop faults [s].
    pub saturation_timeout: f64,
    /// Output magnitude counted as saturated.
    pub saturation_threshold: f64,
    /// Soft-start multiplier increment per tick.
    pub soft_start_step: f64,
}

impl Default for InnerLoopConfig {
    fn default() -> Self {
        Self {
            filter: FilterCoefficients::new(
                1.0,
                &[-4.945, 8.862, -3.967],
                &[1.000, -1.481, 0.4812],
            ),
            saturation_timeout: 0.4,
            saturation_threshold: SATURATION_THRESHOLD,
            soft_start_step: 1.0 / 70.0,
        }
    }
}

impl InnerLoopConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate("inner.filter")?;
        require_positive("inner.saturation_timeout", self.saturation_timeout)?;
        if !(self.saturation_threshold > 0.0 && self.saturation_threshold <= 1.0) {
            return Err(invalid(format!(
                "inner.saturation_threshold {} out of range (0, 1]",
                self.saturation_threshold
            )));
        }
        if !(self.soft_start_step > 0.0 && self.soft_start_step <= 1.0) {
            return Err(invalid(format!(
                "inner.soft_start_step {} out of range (0, 1]",
                self.soft_start_step
            )));
        }
        Ok(())
    }
}

/// Outer position loop (D2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OuterLoopConfig {
    pub filter: FilterCoefficients,
    /// Clamp on the produced tilt setpoint [rad].
    pub theta_ref_max: f64,
}

impl Default for OuterLoopConfig {
    fn default() -> Self {
        Self {
            filter: FilterCoefficients::new(1.0, &[0.18856, -0.17039], &[1.0, -0.73075]),
            theta_ref_max: 0.33,
        }
    }
}

impl OuterLoopConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate("outer.filter")?;
        require_positive("outer.theta_ref_max", self.theta_ref_max)
    }
}

/// Steering loop (D3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Filtered PD (Kp = 1, Kd = 0.1, Tf = 4·dt) at 100 Hz.
    pub filter: FilterCoefficients,
    /// Clamp on the differential correction.
    pub max_input: f64,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            filter: FilterCoefficients::new(1.0, &[3.0, -2.8], &[1.0, -0.8]),
            max_input: 0.5,
        }
    }
}

impl SteeringConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate("steering.filter")?;
        require_positive("steering.max_input", self.max_input)?;
        if self.max_input > 1.0 {
            return Err(invalid(format!(
                "steering.max_input {} exceeds full scale",
                self.max_input
            )));
        }
        Ok(())
    }
}

// ─── Safety ─────────────────────────────────────────────────────────

/// Tip-over and start-condition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Tilt magnitude that disengages the controller [rad].
    pub tip_angle: f64,
    /// Half-width of the near-upright band [rad].
    pub start_angle: f64,
    /// Dwell inside the band before engaging [s].
    pub start_delay: f64,
    /// Dwell outside the band that counts as a pick-up [s].
    pub pickup_detection_time: f64,
    pub start_check_hz: u32,
    /// Wait after boot before entering RUNNING [s].
    pub settle_time: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            tip_angle: 0.85,
            start_angle: 0.3,
            start_delay: 0.4,
            pickup_detection_time: 0.5,
            start_check_hz: START_CHECK_HZ,
            settle_time: IMU_SETTLE_TIME_S,
        }
    }
}

impl SafetyConfig {
    /// Polls needed to satisfy a dwell time at `start_check_hz` (at least one).
    pub fn checks_needed(&self, dwell_s: f64) -> u32 {
        ((dwell_s * self.start_check_hz as f64).round() as u32).max(1)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("safety.tip_angle", self.tip_angle)?;
        require_positive("safety.start_angle", self.start_angle)?;
        if self.start_angle >= self.tip_angle {
            return Err(invalid(format!(
                "safety.start_angle {} must be below safety.tip_angle {}",
                self.start_angle, self.tip_angle
            )));
        }
        require_positive("safety.start_delay", self.start_delay)?;
        require_positive("safety.pickup_detection_time", self.pickup_detection_time)?;
        if self.start_check_hz == 0 {
            return Err(invalid("safety.start_check_hz must be positive".to_string()));
        }
        if !(self.settle_time.is_finite() && self.settle_time >= 0.0) {
            return Err(invalid(format!(
                "safety.settle_time {} must be non-negative",
                self.settle_time
            )));
        }
        Ok(())
    }
}

// ─── Battery ────────────────────────────────────────────────────────

/// Supply voltage plausibility window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub v_nominal: f64,
    pub v_min: f64,
    pub v_max: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            v_nominal: V_NOMINAL,
            v_min: V_MIN_PLAUSIBLE,
            v_max: V_MAX_PLAUSIBLE,
        }
    }
}

impl BatteryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("battery.v_min", self.v_min)?;
        if !(self.v_min <= self.v_nominal && self.v_nominal <= self.v_max) {
            return Err(invalid(format!(
                "battery: expected v_min <= v_nominal <= v_max, got {} / {} / {}",
                self.v_min, self.v_nominal, self.v_max
            )));
        }
        Ok(())
    }
}

// ─── Button ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// Hold time that requests shutdown [s].
    pub long_press_time: f64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            long_press_time: LONG_PRESS_TIME_S,
        }
    }
}

impl ButtonConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("button.long_press_time", self.long_press_time)
    }
}

// ─── Priorities ─────────────────────────────────────────────────────

/// `SCHED_FIFO` priority per execution context (applied with the `rt` feature).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub fast: i32,
    pub outer: i32,
    pub setpoint_manager: i32,
    pub panel: i32,
    pub battery: i32,
    pub status: i32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            fast: 80,
            outer: 60,
            setpoint_manager: 50,
            panel: 30,
            battery: 20,
            status: 10,
        }
    }
}

// ─── Presets ────────────────────────────────────────────────────────

/// Named constant sets for the supported hardware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// EduMiP on a BeagleBone Blue, full balance configuration.
    #[default]
    EduMip,
    /// Bench rig used to tune the complementary filter: IMU flat on the
    /// board (no mounting offset) and a 1.7 s filter time constant.
    FilterBench,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::EduMip, Preset::FilterBench];

    pub const fn name(self) -> &'static str {
        match self {
            Self::EduMip => "edumip",
            Self::FilterBench => "filter_bench",
        }
    }

    /// Build the full configuration for this preset.
    pub fn config(self) -> BalanceConfig {
        match self {
            Self::EduMip => BalanceConfig::default(),
            Self::FilterBench => BalanceConfig {
                mechanics: MechanicsConfig {
                    mount_angle: 0.0,
                    ..MechanicsConfig::default()
                },
                estimator: EstimatorConfig {
                    filter_w: 1.0 / 1.7,
                },
                ..BalanceConfig::default()
            },
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
