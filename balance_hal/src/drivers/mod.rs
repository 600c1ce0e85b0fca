//! HAL driver implementations.
//!
//! - [`simulation`] - Wheeled inverted-pendulum simulation for development
//!   and testing without a robot
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `HalDriver` trait from `balance_common::hal::driver`
//! 3. Register the driver in [`builtin_registry`]

pub mod simulation;

use balance_common::hal::driver::HalError;

use crate::driver_registry::DriverRegistry;

/// Build a registry holding every built-in driver.
pub fn builtin_registry() -> Result<DriverRegistry, HalError> {
    let mut registry = DriverRegistry::new();
    registry.register(simulation::DRIVER_NAME, simulation::create_driver)?;
    Ok(registry)
}
