//! Balance Common Library
//!
//! Shared constants, configuration schema and hardware contracts used by
//! every crate of the two-wheeled balance controller workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Default rates, thresholds and physical limits
//! - [`config`] - TOML loading trait and configuration errors
//! - [`control_unit`] - Controller configuration, presets and state enums
//! - [`hal`] - Hardware collaborator traits and sample types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;
