//! Scripted operator hand.
//!
//! Stands in for the person who picks the robot up off the ground and holds
//! it upright until the controller takes over:
//!
//! ```text
//! Resting ──(on ground for rest_time)──► Lifting ──(motors enabled)──► Released
//!    ▲                                                                     │
//!    └──────────────────────────(motors disabled)──────────────────────────┘
//! ```

use super::plant::PendulumPlant;

/// Hand behaviour settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HandParams {
    /// Time the robot lies on the ground before being picked up [s].
    pub rest_time: f64,
    /// Tilt the hand holds the robot at [rad].
    pub hold_angle: f64,
    /// Maximum speed of the hand [rad/s].
    pub max_rate: f64,
}

impl Default for HandParams {
    fn default() -> Self {
        Self {
            rest_time: 1.0,
            hold_angle: 0.0,
            max_rate: 3.0,
        }
    }
}

/// Current phase of the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPhase {
    /// Hands off, waiting for the robot to settle on the ground.
    Resting,
    /// Lifting to and holding at the hold angle.
    Lifting,
    /// The controller has the robot.
    Released,
}

/// Operator script state.
#[derive(Debug, Clone)]
pub struct Hand {
    params: HandParams,
    phase: HandPhase,
    rested: f64,
}

impl Hand {
    /// Create a hand in the resting phase.
    pub fn new(params: HandParams) -> Self {
        Self {
            params,
            phase: HandPhase::Resting,
            rested: 0.0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> HandPhase {
        self.phase
    }

    /// Act on the plant for one step. Returns true when the hand is holding
    /// the body, in which case the free dynamics must not run for the body.
    pub fn act(&mut self, plant: &mut PendulumPlant, motors_enabled: bool, dt: f64) -> bool {
        match self.phase {
            HandPhase::Resting => {
                if plant.on_ground() {
                    self.rested += dt;
                } else {
                    self.rested = 0.0;
                }
                if self.rested >= self.params.rest_time {
                    self.phase = HandPhase::Lifting;
                }
                false
            }
            HandPhase::Lifting => {
                if motors_enabled {
                    self.phase = HandPhase::Released;
                    return false;
                }
                plant.hold(self.params.hold_angle, self.params.max_rate, dt);
                true
            }
            HandPhase::Released => {
                if !motors_enabled {
                    self.phase = HandPhase::Resting;
                    self.rested = 0.0;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::plant::PlantParams;
    use super::*;

    const DT: f64 = 0.01;

    #[test]
    fn lifts_after_rest_time_and_releases_on_enable() {
        let mut plant = PendulumPlant::new(PlantParams::default());
        let mut hand = Hand::new(HandParams::default());

        for _ in 0..99 {
            assert!(!hand.act(&mut plant, false, DT));
        }
        assert_eq!(hand.phase(), HandPhase::Resting);
        hand.act(&mut plant, false, DT);
        assert_eq!(hand.phase(), HandPhase::Lifting);

        // 1.3 rad at 3 rad/s takes under half a second
        for _ in 0..60 {
            assert!(hand.act(&mut plant, false, DT));
        }
        assert!(plant.tilt().abs() < 1e-9);

        assert!(!hand.act(&mut plant, true, DT));
        assert_eq!(hand.phase(), HandPhase::Released);
    }

    #[test]
    fn rests_again_after_disable() {
        let mut plant = PendulumPlant::new(PlantParams::default());
        let mut hand = Hand::new(HandParams {
            rest_time: 0.0,
            ..HandParams::default()
        });
        hand.act(&mut plant, false, DT);
        hand.act(&mut plant, true, DT);
        assert_eq!(hand.phase(), HandPhase::Released);
        hand.act(&mut plant, false, DT);
        assert_eq!(hand.phase(), HandPhase::Resting);
    }

    #[test]
    fn rest_timer_needs_body_on_ground() {
        let mut plant = PendulumPlant::new(PlantParams::default());
        plant.place(0.5);
        let mut hand = Hand::new(HandParams::default());
        for _ in 0..200 {
            hand.act(&mut plant, false, DT);
        }
        assert_eq!(hand.phase(), HandPhase::Resting);
    }
}
