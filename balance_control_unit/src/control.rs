//! Control engine root.
//!
//! Discrete transfer functions over fixed-capacity delay lines, the
//! complementary-filter state estimator and the three balance loops:
//! D1 (tilt), D2 (position, produces the tilt setpoint) and D3 (steering).

pub mod delay_line;
pub mod estimator;
pub mod filters;
pub mod inner;
pub mod outer;
pub mod steering;
