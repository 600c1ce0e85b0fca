//! Hardware collaborator contracts.
//!
//! The controller never touches registers directly. It talks to the IMU,
//! encoders, motors, battery sensor, button and LEDs through the traits in
//! [`driver`], using the plain data types in [`types`].

pub mod driver;
pub mod types;
