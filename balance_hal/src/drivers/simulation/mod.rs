//! Simulation driver module.
//!
//! Runs the controller against a wheeled inverted-pendulum model and a
//! scripted operator, so the full engage/balance/fall cycle can be exercised
//! without a robot.

mod devices;
mod driver;
mod hand;
mod plant;

pub use devices::{CHANNELS, SimDevices, SimImu, SimWorld};
pub use driver::SimulationDriver;
pub use hand::{Hand, HandParams, HandPhase};
pub use plant::{PendulumPlant, PlantParams};

use balance_common::hal::driver::HalDriver;

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}
