//! Wheeled inverted-pendulum physics.
//!
//! A linearised two-wheel model: the body is a point-mass pendulum over the
//! axle, each wheel is a damped inertia driven by its motor. Motor torque
//! accelerates the wheel and pushes the body back the other way, which is
//! what lets a forward duty catch a forward lean.
//!
//! Angles are in radians. `tilt` is the body angle from vertical, the same
//! quantity the controller estimates. Wheel angles are measured relative to
//! the body, which is what a shaft encoder reports.

/// Physical parameters of the simulated robot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantParams {
    /// Gravity term `g / l` [1/s²].
    pub pendulum_gain: f64,
    /// Body angular acceleration per unit mean duty [rad/s²].
    pub body_drive_gain: f64,
    /// Wheel angular acceleration per unit duty [rad/s²].
    pub wheel_drive_gain: f64,
    /// Wheel viscous damping (back-EMF) [1/s].
    pub wheel_damping: f64,
    /// Body damping [1/s].
    pub body_damping: f64,
    /// Tilt at which the body rests on the ground [rad].
    pub ground_angle: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            pendulum_gain: 150.0,
            body_drive_gain: 60.0,
            wheel_drive_gain: 400.0,
            wheel_damping: 20.0,
            body_damping: 0.5,
            ground_angle: 1.3,
        }
    }
}

/// Integrated plant state.
#[derive(Debug, Clone)]
pub struct PendulumPlant {
    params: PlantParams,
    tilt: f64,
    tilt_rate: f64,
    /// Wheel angles relative to the body, left then right.
    wheel: [f64; 2],
    wheel_rate: [f64; 2],
}

impl PendulumPlant {
    /// Create a plant lying on the ground, leaning forward.
    pub fn new(params: PlantParams) -> Self {
        let tilt = params.ground_angle;
        Self {
            params,
            tilt,
            tilt_rate: 0.0,
            wheel: [0.0; 2],
            wheel_rate: [0.0; 2],
        }
    }

    /// Advance one explicit-Euler step.
    ///
    /// `drive` holds the effective duty applied to the left and right wheel
    /// (already polarity-corrected and voltage-scaled).
    pub fn step(&mut self, drive: [f64; 2], dt: f64) {
        let p = &self.params;
        let mean = 0.5 * (drive[0] + drive[1]);

        let tilt_acc = p.pendulum_gain * self.tilt.sin()
            - p.body_drive_gain * mean
            - p.body_damping * self.tilt_rate;
        self.tilt_rate += tilt_acc * dt;
        self.tilt += self.tilt_rate * dt;

        if self.tilt.abs() >= p.ground_angle {
            self.tilt = p.ground_angle.copysign(self.tilt);
            self.tilt_rate = 0.0;
        }

        self.step_wheels(drive, dt);
    }

    /// Advance only the wheels, leaving the body where it is.
    pub fn step_wheels(&mut self, drive: [f64; 2], dt: f64) {
        let p = &self.params;
        for (i, duty) in drive.into_iter().enumerate() {
            let acc = p.wheel_drive_gain * duty - p.wheel_damping * self.wheel_rate[i];
            self.wheel_rate[i] += acc * dt;
            self.wheel[i] += self.wheel_rate[i] * dt;
        }
    }

    /// Move the body toward `target` at no more than `max_rate` [rad/s],
    /// overriding the dynamics. Used by the scripted hand.
    pub fn hold(&mut self, target: f64, max_rate: f64, dt: f64) {
        let max_step = max_rate * dt;
        let delta = (target - self.tilt).clamp(-max_step, max_step);
        self.tilt += delta;
        self.tilt_rate = if dt > 0.0 { delta / dt } else { 0.0 };
    }

    /// Put the body at `tilt` with zero velocity.
    pub fn place(&mut self, tilt: f64) {
        self.tilt = tilt;
        self.tilt_rate = 0.0;
    }

    /// Body tilt [rad].
    pub fn tilt(&self) -> f64 {
        self.tilt
    }

    /// Body tilt rate [rad/s].
    pub fn tilt_rate(&self) -> f64 {
        self.tilt_rate
    }

    /// Wheel angle relative to the body, `0` = left, `1` = right [rad].
    pub fn wheel_angle(&self, side: usize) -> f64 {
        self.wheel[side]
    }

    /// True when the body rests on the ground.
    pub fn on_ground(&self) -> bool {
        self.tilt.abs() >= self.params.ground_angle - 1e-9
    }
}
