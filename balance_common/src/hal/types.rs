//! Sample and indicator types exchanged with HAL drivers.

/// One accelerometer + gyroscope reading delivered by the IMU.
///
/// Axes follow the sensor frame: `accel` in m/s² and `gyro` in deg/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    pub accel: [f64; 3],
    pub gyro: [f64; 3],
}

impl ImuSample {
    pub const fn new(accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self { accel, gyro }
    }
}

/// Status LEDs on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Red,
    Green,
}
