//! Start-condition detection.
//!
//! The robot engages only after it has been picked up (tilt outside the
//! near-upright band) and then held steady inside the band. Each phase needs
//! its own run of consecutive polls; leaving the condition restarts that
//! phase's count.

use std::time::Duration;

use balance_common::control_unit::config::SafetyConfig;

/// Progress of the start sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    /// Waiting for `|tilt| > start_angle`.
    AwaitingPickup { checks: u32 },
    /// Waiting for `|tilt| < start_angle`.
    AwaitingUpright { checks: u32 },
    /// Both dwells satisfied.
    Ready,
}

/// Two-phase dwell detector, polled at `start_check_hz`.
#[derive(Debug, Clone)]
pub struct StartDetector {
    start_angle: f64,
    pickup_needed: u32,
    upright_needed: u32,
    period: Duration,
    phase: StartPhase,
}

impl StartDetector {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            start_angle: config.start_angle,
            pickup_needed: config.checks_needed(config.pickup_detection_time),
            upright_needed: config.checks_needed(config.start_delay),
            period: Duration::from_secs_f64(1.0 / f64::from(config.start_check_hz.max(1))),
            phase: StartPhase::AwaitingPickup { checks: 0 },
        }
    }

    /// Feed one tilt poll and return the new phase.
    pub fn check(&mut self, tilt: f64) -> StartPhase {
        self.phase = match self.phase {
            StartPhase::AwaitingPickup { checks } => {
                let checks = if tilt.abs() > self.start_angle { checks + 1 } else { 0 };
                if checks >= self.pickup_needed {
                    StartPhase::AwaitingUpright { checks: 0 }
                } else {
                    StartPhase::AwaitingPickup { checks }
                }
            }
            StartPhase::AwaitingUpright { checks } => {
                let checks = if tilt.abs() < self.start_angle { checks + 1 } else { 0 };
                if checks >= self.upright_needed {
                    StartPhase::Ready
                } else {
                    StartPhase::AwaitingUpright { checks }
                }
            }
            StartPhase::Ready => StartPhase::Ready,
        };
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = StartPhase::AwaitingPickup { checks: 0 };
    }

    #[inline]
    pub fn phase(&self) -> StartPhase {
        self.phase
    }

    /// Interval between polls.
    #[inline]
    pub fn poll_period(&self) -> Duration {
        self.period
    }
}
