//! # Balance Control Unit Library
//!
//! Real-time balance controller for a two-wheeled inverted-pendulum robot.
//! One IMU sample per fast tick drives the estimator, the supervisor gates,
//! the tilt loop and the steering loop; the position loop and the auxiliary
//! monitors run in their own slower contexts.
//!
//! ## Control Hierarchy
//!
//! 1. **RunState**: process lifecycle (UNINITIALIZED, RUNNING, PAUSED, EXITING)
//! 2. **ControlState**: engaged/disengaged, owned by the [`supervisor`]
//! 3. **D2** (outer): progression error → tilt setpoint
//! 4. **D1** (inner): tilt error → drive command
//! 5. **D3** (steering): heading error → differential correction
//!
//! ## Zero-Allocation Fast Tick
//!
//! Every filter runs over fixed-capacity delay lines allocated at startup.
//! The fast tick performs no heap allocation and no blocking I/O.

pub mod battery;
pub mod button;
pub mod control;
pub mod cycle;
pub mod error;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod supervisor;
