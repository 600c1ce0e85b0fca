//! State enums for the balance controller.
//!
//! Two independent axes: the top-level lifecycle ([`RunState`]), gated by
//! the button and process signals, and the control axis ([`ControlState`]),
//! owned by the supervisor. Both are `#[repr(u8)]` so they can live in
//! atomics shared between execution contexts.

use serde::{Deserialize, Serialize};

/// Top-level process lifecycle.
///
/// `Exiting` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum RunState {
    /// Hardware up, IMU settling; loops do not drive motors.
    #[default]
    Uninitialized = 0,
    /// Balancing allowed.
    Running = 1,
    /// Paused by the operator; controller is kept disengaged.
    Paused = 2,
    /// Shutdown requested; every context exits within one period.
    Exiting = 3,
}

impl RunState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Running),
            2 => Some(Self::Paused),
            3 => Some(Self::Exiting),
            _ => None,
        }
    }

    /// Upper-case label used by the status reporter.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Exiting => "EXITING",
        }
    }
}

/// Whether the balance loops are authorized to drive the motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum ControlState {
    #[default]
    Disengaged = 0,
    Engaged = 1,
}

impl ControlState {
    #[inline]
    pub const fn is_engaged(self) -> bool {
        matches!(self, Self::Engaged)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Engaged => "ENGAGED",
            Self::Disengaged => "DISENGAGED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_roundtrip_u8() {
        for s in [
            RunState::Uninitialized,
            RunState::Running,
            RunState::Paused,
            RunState::Exiting,
        ] {
            assert_eq!(RunState::from_u8(s as u8), Some(s));
        }
        assert_eq!(RunState::from_u8(4), None);
    }

    #[test]
    fn control_state_defaults_to_disengaged() {
        assert_eq!(ControlState::default(), ControlState::Disengaged);
        assert!(!ControlState::default().is_engaged());
    }

    #[test]
    fn labels() {
        assert_eq!(RunState::Paused.label(), "PAUSED");
        assert_eq!(ControlState::Engaged.label(), "ENGAGED");
    }
}
