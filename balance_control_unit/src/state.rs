//! Shared runtime state.
//!
//! - [`shared`] - Orientation record, setpoint record and lifecycle cell
//!   shared by every execution context
//! - [`lifecycle`] - RunState transition table

pub mod lifecycle;
pub mod shared;
