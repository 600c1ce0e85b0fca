//! HAL driver trait, collaborator traits and error types.
//!
//! This module defines:
//! - `HalDriver` trait - Interface for pluggable hardware backends
//! - One trait per collaborator (`ImuSource`, `Encoders`, `Motors`,
//!   `VoltageSensor`, `Button`, `Indicator`)
//! - `HalHandles` - The set of collaborators a driver hands out on `init()`
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type

use std::sync::Arc;

use thiserror::Error;

use crate::control_unit::config::BalanceConfig;
use crate::hal::types::{ImuSample, Led};

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// IMU sample delivery is already running
    #[error("IMU already started")]
    AlreadyStarted,
}

/// Callback invoked once per IMU sample, from the driver's delivery context.
pub type SampleHandler = Box<dyn FnMut(&ImuSample) + Send>;

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Interrupt-style IMU sample source.
///
/// After `start()` the driver calls `handler` at `rate_hz` from its own
/// context until `stop()`. Calls never overlap.
pub trait ImuSource: Send {
    fn start(&mut self, rate_hz: u32, handler: SampleHandler) -> Result<(), HalError>;

    /// Stop delivery and drop the handler. Idempotent.
    fn stop(&mut self);
}

/// Quadrature encoder counters, signed and cumulative.
pub trait Encoders: Send + Sync {
    fn position(&self, channel: u8) -> i64;
    fn set_position(&self, channel: u8, value: i64);
}

/// Normalized motor duty sink.
pub trait Motors: Send + Sync {
    /// Set one channel to `duty` in [-1, 1].
    fn set_duty(&self, channel: u8, duty: f64);
    fn set_all(&self, duty: f64);
    /// Authorize output (release the H-bridge standby).
    fn enable(&self);
    fn disable(&self);
}

/// Battery pack voltage [V], unfiltered.
pub trait VoltageSensor: Send + Sync {
    fn read_volts(&self) -> f64;
}

/// The user button, polled level.
pub trait Button: Send + Sync {
    fn is_pressed(&self) -> bool;
}

/// On/off LED output.
pub trait Indicator: Send + Sync {
    fn set_led(&self, led: Led, on: bool);
}

/// Collaborators returned by a successfully initialized driver.
///
/// The IMU source is owned (it is started exactly once); everything else is
/// shared between execution contexts.
pub struct HalHandles {
    pub imu: Box<dyn ImuSource>,
    pub encoders: Arc<dyn Encoders>,
    pub motors: Arc<dyn Motors>,
    pub voltage: Arc<dyn VoltageSensor>,
    pub button: Arc<dyn Button>,
    pub leds: Arc<dyn Indicator>,
}

/// Trait defining the interface for HAL drivers.
///
/// # Lifecycle
///
/// 1. `init()` - Called once at startup; failure is fatal
/// 2. The control unit drives the returned [`HalHandles`]
/// 3. `shutdown()` - Called after every execution context has stopped
pub trait HalDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Bring up the hardware and hand out its collaborators.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if any peripheral cannot be opened.
    fn init(&mut self, config: &BalanceConfig) -> Result<HalHandles, HalError>;

    /// Release the hardware. Motors must be left disabled.
    fn shutdown(&mut self) -> Result<(), HalError>;
}
