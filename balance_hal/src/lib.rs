//! # Balance HAL Library
//!
//! Pluggable hardware backends for the balance controller. Drivers implement
//! the `HalDriver` trait defined in `balance_common::hal::driver` and hand
//! out one collaborator per peripheral.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        balance_hal                           │
//! │  ┌──────────────────┐        ┌────────────────────────────┐  │
//! │  │ Driver Registry  │──────► │ HalDriver::init()          │  │
//! │  │ name → factory   │        │   → HalHandles             │  │
//! │  └──────────────────┘        │     imu / encoders /       │  │
//! │                              │     motors / voltage /     │  │
//! │                              │     button / leds          │  │
//! │                              └────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::builtin_registry;
