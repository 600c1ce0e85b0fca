//! Body state estimation.
//!
//! Fuses one IMU sample and the two encoder counts into tilt, progression
//! and heading. Runs inside the fast context: bounded time, no allocation,
//! no blocking.

use balance_common::consts::DEG_TO_RAD;
use balance_common::control_unit::config::{BalanceConfig, MechanicsConfig, WiringConfig};
use balance_common::hal::types::ImuSample;

use super::filters::ComplementaryFilter;

/// Output of one estimator update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimate {
    /// Body tilt including the mounting offset [rad].
    pub tilt: f64,
    pub wheel_angle_l: f64,
    pub wheel_angle_r: f64,
    /// Tilt plus mean wheel angle [rad].
    pub progression: f64,
    /// Yaw proxy [rad].
    pub heading: f64,
}

/// Complementary-filter tilt estimator with wheel odometry.
#[derive(Debug, Clone)]
pub struct Estimator {
    filter: ComplementaryFilter,
    gyro_angle: f64,
    dt: f64,
    mount_angle: f64,
    wheel: WheelGeometry,
}

impl Estimator {
    pub fn new(config: &BalanceConfig) -> Self {
        let dt = config.rates.fast_dt();
        Self {
            filter: ComplementaryFilter::new(config.estimator.filter_w, dt),
            gyro_angle: 0.0,
            dt,
            mount_angle: config.mechanics.mount_angle,
            wheel: WheelGeometry::new(&config.mechanics, &config.wiring),
        }
    }

    /// Process one sample and the current encoder counts.
    pub fn update(&mut self, sample: &ImuSample, ticks_l: i64, ticks_r: i64) -> Estimate {
        let accel_angle = (-sample.accel[2]).atan2(sample.accel[1]);
        self.gyro_angle += sample.gyro[0] * self.dt * DEG_TO_RAD;

        let tilt = self.filter.update(accel_angle, self.gyro_angle) + self.mount_angle;

        let wheel_angle_l = self.wheel.angle_l(ticks_l);
        let wheel_angle_r = self.wheel.angle_r(ticks_r);

        Estimate {
            tilt,
            wheel_angle_l,
            wheel_angle_r,
            progression: tilt + 0.5 * (wheel_angle_l + wheel_angle_r),
            heading: (wheel_angle_r - wheel_angle_l) * self.wheel.radius_over_track,
        }
    }
}

/// Encoder count to wheel angle conversion.
#[derive(Debug, Clone, Copy)]
struct WheelGeometry {
    rad_per_count_l: f64,
    rad_per_count_r: f64,
    radius_over_track: f64,
}

impl WheelGeometry {
    fn new(mechanics: &MechanicsConfig, wiring: &WiringConfig) -> Self {
        let counts_per_rev = mechanics.gearbox * mechanics.encoder_res;
        let tau = core::f64::consts::TAU;
        Self {
            rad_per_count_l: tau / (f64::from(wiring.encoder_polarity_l) * counts_per_rev),
            rad_per_count_r: tau / (f64::from(wiring.encoder_polarity_r) * counts_per_rev),
            radius_over_track: mechanics.wheel_radius_m / mechanics.track_width_m,
        }
    }

    #[inline]
    fn angle_l(&self, ticks: i64) -> f64 {
        ticks as f64 * self.rad_per_count_l
    }

    #[inline]
    fn angle_r(&self, ticks: i64) -> f64 {
        ticks as f64 * self.rad_per_count_r
    }
}
