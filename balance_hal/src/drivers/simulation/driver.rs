//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `HalDriver` trait by handing out
//! simulated peripherals that all act on one shared [`SimWorld`].

use std::sync::Arc;

use balance_common::control_unit::config::BalanceConfig;
use balance_common::hal::driver::{HalDriver, HalError, HalHandles, Motors};
use parking_lot::Mutex;
use tracing::info;

use super::devices::{CHANNELS, SimDevices, SimImu, SimWorld};
use super::hand::HandParams;
use super::plant::PlantParams;

/// Simulation driver implementing the HalDriver trait.
pub struct SimulationDriver {
    name: &'static str,
    version: &'static str,
    plant: PlantParams,
    hand: HandParams,
    devices: Option<Arc<SimDevices>>,
}

impl SimulationDriver {
    /// Create a new simulation driver with default physics.
    pub fn new() -> Self {
        Self::with_params(PlantParams::default(), HandParams::default())
    }

    /// Create a simulation driver with custom physics and operator script.
    pub fn with_params(plant: PlantParams, hand: HandParams) -> Self {
        Self {
            name: super::DRIVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
            plant,
            hand,
            devices: None,
        }
    }

    /// Peripherals handed out by the last `init()`.
    pub fn devices(&self) -> Option<&Arc<SimDevices>> {
        self.devices.as_ref()
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &BalanceConfig) -> Result<HalHandles, HalError> {
        let wiring = &config.wiring;
        for (what, channel) in [
            ("motor_channel_l", wiring.motor_channel_l),
            ("motor_channel_r", wiring.motor_channel_r),
            ("encoder_channel_l", wiring.encoder_channel_l),
            ("encoder_channel_r", wiring.encoder_channel_r),
        ] {
            if channel == 0 || channel as usize > CHANNELS {
                return Err(HalError::InitFailed(format!(
                    "{what} {channel} out of range [1, {CHANNELS}]"
                )));
            }
        }

        info!(
            "Initializing simulation driver: mount {:.3} rad, gearbox {}, {} counts/rev",
            config.mechanics.mount_angle, config.mechanics.gearbox, config.mechanics.encoder_res
        );

        let world = Arc::new(Mutex::new(SimWorld::new(
            config,
            self.plant.clone(),
            self.hand.clone(),
        )));
        let devices = Arc::new(SimDevices::new(Arc::clone(&world)));
        self.devices = Some(Arc::clone(&devices));

        Ok(HalHandles {
            imu: Box::new(SimImu::new(world)),
            encoders: devices.clone(),
            motors: devices.clone(),
            voltage: devices.clone(),
            button: devices.clone(),
            leds: devices,
        })
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutting down simulation driver");
        if let Some(devices) = self.devices.take() {
            devices.set_all(0.0);
            devices.disable();
        }
        Ok(())
    }
}
