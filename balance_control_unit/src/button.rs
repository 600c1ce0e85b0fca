//! Pause button and status LEDs.
//!
//! The button is polled from the panel context. A release toggles
//! RUNNING ↔ PAUSED; holding it for `long_press_time` requests shutdown and
//! swallows the release that follows.

use std::sync::Arc;

use balance_common::control_unit::config::ButtonConfig;
use balance_common::control_unit::state::{ControlState, RunState};
use balance_common::hal::driver::Indicator;
use balance_common::hal::types::Led;
use tracing::info;

use crate::state::lifecycle::LifecycleEvent;

/// Edge and hold-time tracking for the pause button.
#[derive(Debug, Clone)]
pub struct ButtonMonitor {
    long_press_time: f64,
    pressed: bool,
    held: f64,
    long_press_fired: bool,
}

impl ButtonMonitor {
    pub fn new(config: &ButtonConfig) -> Self {
        Self {
            long_press_time: config.long_press_time,
            pressed: false,
            held: 0.0,
            long_press_fired: false,
        }
    }

    /// Feed one poll taken `dt` seconds after the previous one.
    pub fn update(&mut self, pressed: bool, dt: f64) -> Option<LifecycleEvent> {
        match (self.pressed, pressed) {
            (false, true) => {
                self.pressed = true;
                self.held = 0.0;
                self.long_press_fired = false;
                None
            }
            (true, true) => {
                self.held += dt;
                if !self.long_press_fired && self.held >= self.long_press_time {
                    self.long_press_fired = true;
                    info!(held_s = self.held, "Long press, exit requested");
                    Some(LifecycleEvent::Exit)
                } else {
                    None
                }
            }
            (true, false) => {
                self.pressed = false;
                (!self.long_press_fired).then_some(LifecycleEvent::PauseToggle)
            }
            (false, false) => None,
        }
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

/// Maps the control state onto the two LEDs.
pub struct LedPolicy {
    leds: Arc<dyn Indicator>,
    shown: Option<(bool, bool)>,
}

impl LedPolicy {
    pub fn new(leds: Arc<dyn Indicator>) -> Self {
        Self { leds, shown: None }
    }

    /// `(green, red)` for a state pair.
    pub fn pattern(run_state: RunState, control: ControlState) -> (bool, bool) {
        if control.is_engaged() && run_state == RunState::Running {
            (true, false)
        } else {
            (false, true)
        }
    }

    /// Drive the LEDs. Only changes are written.
    pub fn apply(&mut self, run_state: RunState, control: ControlState) {
        let pattern = Self::pattern(run_state, control);
        if self.shown == Some(pattern) {
            return;
        }
        let (green, red) = pattern;
        self.leds.set_led(Led::Green, green);
        self.leds.set_led(Led::Red, red);
        self.shown = Some(pattern);
    }

    /// Both LEDs off, used on exit.
    pub fn clear(&mut self) {
        self.leds.set_led(Led::Green, false);
        self.leds.set_led(Led::Red, false);
        self.shown = Some((false, false));
    }
}
