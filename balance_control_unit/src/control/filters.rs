//! Discrete transfer functions.
//!
//! ```text
//!            b0 + b1·z⁻¹ + … + bn·z⁻ⁿ
//! H(z) = K · ────────────────────────
//!            1  + a1·z⁻¹ + … + an·z⁻ⁿ
//! ```
//!
//! The recursion runs on the unscaled signal `w[k]` and the gain is applied
//! on the way out, so a time-varying gain (battery compensation) scales the
//! output without moving the poles.

use balance_common::control_unit::config::{Coefficients, FilterCoefficients, taps};

use super::delay_line::DelayLine;

// ─── IIR Filter ─────────────────────────────────────────────────────

/// Direct-form IIR filter with owned input and output history.
#[derive(Debug, Clone)]
pub struct IirFilter {
    gain: f64,
    num: Coefficients,
    den: Coefficients,
    inputs: DelayLine,
    outputs: DelayLine,
    last_output: f64,
}

impl IirFilter {
    /// Build from raw taps. `den[0]` is taken as 1.
    pub fn new(gain: f64, num: &[f64], den: &[f64]) -> Self {
        let num = taps(num);
        let den = taps(den);
        Self {
            gain,
            inputs: DelayLine::new(num.len()),
            outputs: DelayLine::new(den.len().saturating_sub(1).max(1)),
            num,
            den,
            last_output: 0.0,
        }
    }

    pub fn from_coefficients(coeffs: &FilterCoefficients) -> Self {
        Self::new(coeffs.gain, &coeffs.num, &coeffs.den)
    }

    /// Process one input sample with the configured gain.
    #[inline]
    pub fn march(&mut self, input: f64) -> f64 {
        self.march_with_gain(input, self.gain)
    }

    /// Process one input sample with an overriding gain.
    pub fn march_with_gain(&mut self, input: f64, gain: f64) -> f64 {
        self.inputs.push(input);

        let mut w = 0.0;
        for (age, b) in self.num.iter().enumerate() {
            w += b * self.inputs.get(age);
        }
        // outputs.get(0) is w[k-1] until the push below
        for (j, a) in self.den.iter().enumerate().skip(1) {
            w -= a * self.outputs.get(j - 1);
        }
        self.outputs.push(w);

        self.last_output = gain * w;
        self.last_output
    }

    /// Zero the history. Coefficients are kept.
    #[inline]
    pub fn reset(&mut self) {
        self.inputs.reset();
        self.outputs.reset();
        self.last_output = 0.0;
    }

    #[inline]
    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    #[inline]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Steady-state gain `K · Σb / Σa`, or `None` for a pole at z = 1.
    pub fn dc_gain(&self) -> Option<f64> {
        let den: f64 = self.den.iter().sum();
        if den.abs() < 1e-12 {
            return None;
        }
        Some(self.gain * self.num.iter().sum::<f64>() / den)
    }
}

// ─── Complementary Filter ───────────────────────────────────────────

/// Low-pass on the accelerometer angle plus the exactly complementary
/// high-pass on the integrated gyro angle.
///
/// ```text
/// LPF(z) = w·dt·z⁻¹       / (1 + (w·dt − 1)·z⁻¹)
/// HPF(z) = (1 − z⁻¹)      / (1 + (w·dt − 1)·z⁻¹)
/// LPF + HPF = 1
/// ```
///
/// Both halves share the single pole `1 − w·dt`.
#[derive(Debug, Clone)]
pub struct ComplementaryFilter {
    low_pass: IirFilter,
    high_pass: IirFilter,
}

impl ComplementaryFilter {
    pub fn new(w: f64, dt: f64) -> Self {
        let (lp_num, den) = Self::low_pass_coefficients(w, dt);
        let (hp_num, _) = Self::high_pass_coefficients(w, dt);
        Self {
            low_pass: IirFilter::new(1.0, &lp_num, &den),
            high_pass: IirFilter::new(1.0, &hp_num, &den),
        }
    }

    /// `(num, den)` of the accelerometer low-pass.
    pub fn low_pass_coefficients(w: f64, dt: f64) -> ([f64; 2], [f64; 2]) {
        let wdt = w * dt;
        ([0.0, wdt], [1.0, wdt - 1.0])
    }

    /// `(num, den)` of the gyro high-pass.
    pub fn high_pass_coefficients(w: f64, dt: f64) -> ([f64; 2], [f64; 2]) {
        ([1.0, -1.0], [1.0, w * dt - 1.0])
    }

    /// Fuse one accelerometer angle and one integrated gyro angle [rad].
    #[inline]
    pub fn update(&mut self, accel_angle: f64, gyro_angle: f64) -> f64 {
        self.low_pass.march(accel_angle) + self.high_pass.march(gyro_angle)
    }

    pub fn reset(&mut self) {
        self.low_pass.reset();
        self.high_pass.reset();
    }
}
