//! Control unit shared types.
//!
//! - [`config`] - `BalanceConfig` schema, named presets and validation
//! - [`state`] - Lifecycle and control-state enums

pub mod config;
pub mod state;
