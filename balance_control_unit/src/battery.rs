//! Supply-voltage sampling.
//!
//! Out-of-window readings are replaced by the nominal voltage before they
//! reach the shared state, so D1 can divide by `v_batt` unconditionally.

use std::sync::Arc;

use balance_common::control_unit::config::BatteryConfig;
use balance_common::hal::driver::VoltageSensor;
use tracing::{debug, warn};

use crate::state::shared::SharedState;

/// Periodic pack-voltage sampler.
pub struct BatteryMonitor {
    sensor: Arc<dyn VoltageSensor>,
    v_nominal: f64,
    v_min: f64,
    v_max: f64,
    implausible: bool,
}

impl BatteryMonitor {
    pub fn new(config: &BatteryConfig, sensor: Arc<dyn VoltageSensor>) -> Self {
        Self {
            sensor,
            v_nominal: config.v_nominal,
            v_min: config.v_min,
            v_max: config.v_max,
            implausible: false,
        }
    }

    /// Map a raw reading into the plausible window.
    pub fn sanitize(&self, raw: f64) -> f64 {
        if raw.is_finite() && (self.v_min..=self.v_max).contains(&raw) {
            raw
        } else {
            self.v_nominal
        }
    }

    /// Read the sensor once and publish the sanitized value.
    pub fn sample(&mut self, shared: &SharedState) -> f64 {
        let raw = self.sensor.read_volts();
        let v_batt = self.sanitize(raw);

        let implausible = v_batt != raw;
        if implausible && !self.implausible {
            warn!(raw, nominal = self.v_nominal, "Implausible pack voltage, using nominal");
        } else if !implausible && self.implausible {
            debug!(v_batt, "Pack voltage back in range");
        }
        self.implausible = implausible;

        shared.update_orientation(|o| o.v_batt = v_batt);
        v_batt
    }
}
