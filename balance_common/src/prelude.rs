//! Prelude module for common re-exports.
//!
//! ```rust
//! use balance_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader};
pub use crate::control_unit::config::{BalanceConfig, FilterCoefficients, Preset};

// ─── State ──────────────────────────────────────────────────────────
pub use crate::control_unit::state::{ControlState, RunState};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{
    Button, DriverFactory, Encoders, HalDriver, HalError, HalHandles, ImuSource, Indicator,
    Motors, SampleHandler, VoltageSensor,
};
pub use crate::hal::types::{ImuSample, Led};
