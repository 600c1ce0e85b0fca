//! Safety module root.
//!
//! Actuator saturation monitoring and start-condition detection. Tip-over
//! and lifecycle gating live in the supervisor.

pub mod saturation;
pub mod start;
