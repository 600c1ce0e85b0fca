//! Engage/disengage supervision.
//!
//! The supervisor is the only writer of the control tag. It is called from
//! the fast loop (per-tick gates) and from the setpoint manager (engage after
//! a start condition, disengage on exit).
//!
//! Engaging does not touch any filter. It bumps the engage epoch under the
//! setpoint lock; each loop sees the new epoch on its next run and clears its
//! own history in its own context, so no context ever resets a delay line
//! another context is marching.

use std::sync::Arc;

use balance_common::control_unit::config::BalanceConfig;
use balance_common::control_unit::state::{ControlState, RunState};
use balance_common::hal::driver::{Encoders, Motors};
use tracing::{info, warn};

use crate::error::StartAborted;
use crate::safety::start::{StartDetector, StartPhase};
use crate::state::shared::{Setpoint, SharedState};

/// Why the controller was disengaged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisengageReason {
    /// Lifecycle left RUNNING while engaged.
    NotRunning,
    /// Tilt magnitude exceeded the tip threshold.
    TipOver { tilt: f64 },
    /// D1 stayed saturated for the configured timeout.
    Saturation,
    /// Process shutdown.
    Exiting,
}

/// Outcome of the per-tick gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickGate {
    /// EXITING: motors disabled, skip the loops.
    Exit,
    /// Disengaged: nothing to run.
    Idle,
    /// A fault or pause disengaged the controller this tick.
    Disengaged(DisengageReason),
    /// Engaged and safe: run D1 and D3.
    Run,
}

/// Owner of the control tag.
pub struct Supervisor {
    shared: Arc<SharedState>,
    motors: Arc<dyn Motors>,
    encoders: Arc<dyn Encoders>,
    encoder_channels: [u8; 2],
    tip_angle: f64,
}

impl Supervisor {
    pub fn new(
        config: &BalanceConfig,
        shared: Arc<SharedState>,
        motors: Arc<dyn Motors>,
        encoders: Arc<dyn Encoders>,
    ) -> Self {
        Self {
            shared,
            motors,
            encoders,
            encoder_channels: [
                config.wiring.encoder_channel_l,
                config.wiring.encoder_channel_r,
            ],
            tip_angle: config.safety.tip_angle,
        }
    }

    /// Zero the references and stop the motors without changing the tag.
    pub fn zero_out(&self) {
        {
            let mut sp = self.shared.lock_setpoint();
            sp.tilt = 0.0;
            sp.progression = 0.0;
            sp.heading = 0.0;
        }
        self.motors.set_all(0.0);
    }

    /// Arm the controller: zero encoders and setpoints, start a new engage
    /// epoch and authorize motor output. Returns the new epoch.
    pub fn engage(&self) -> u64 {
        for channel in self.encoder_channels {
            self.encoders.set_position(channel, 0);
        }
        // Enabled before the tag is published, so any disengage the fast
        // loop performs afterwards also disables.
        self.motors.set_all(0.0);
        self.motors.enable();
        let epoch = {
            let mut sp = self.shared.lock_setpoint();
            sp.tilt = 0.0;
            sp.progression = 0.0;
            sp.heading = 0.0;
            sp.engage_epoch = sp.engage_epoch.wrapping_add(1);
            sp.control = ControlState::Engaged;
            sp.engage_epoch
        };
        info!(epoch, "Controller ENGAGED");
        epoch
    }

    /// Stop and disable the motors and clear the tag.
    pub fn disengage(&self, reason: DisengageReason) {
        let was = {
            let mut sp = self.shared.lock_setpoint();
            std::mem::replace(&mut sp.control, ControlState::Disengaged)
        };
        self.motors.set_all(0.0);
        self.motors.disable();

        if was.is_engaged() {
            match reason {
                DisengageReason::TipOver { tilt } => {
                    warn!(tilt, "Tip-over detected, controller DISENGAGED")
                }
                DisengageReason::Saturation => {
                    warn!("D1 saturated too long, controller DISENGAGED")
                }
                DisengageReason::NotRunning | DisengageReason::Exiting => {
                    info!(?reason, "Controller DISENGAGED")
                }
            }
        }
    }

    /// Per-tick gates, in priority order. Performs the disengage itself.
    ///
    /// `setpoint` is the copy the fast loop took at the start of the tick.
    pub fn evaluate_tick(
        &self,
        setpoint: &Setpoint,
        tilt: f64,
        saturation_latched: bool,
    ) -> TickGate {
        let run_state = self.shared.run_state();
        if run_state == RunState::Exiting {
            self.motors.disable();
            return TickGate::Exit;
        }

        let engaged = setpoint.control.is_engaged();
        if run_state != RunState::Running && engaged {
            self.disengage(DisengageReason::NotRunning);
            return TickGate::Disengaged(DisengageReason::NotRunning);
        }
        if !engaged {
            return TickGate::Idle;
        }
        if saturation_latched {
            self.disengage(DisengageReason::Saturation);
            return TickGate::Disengaged(DisengageReason::Saturation);
        }
        if tilt.abs() > self.tip_angle {
            let reason = DisengageReason::TipOver { tilt };
            self.disengage(reason);
            return TickGate::Disengaged(reason);
        }
        TickGate::Run
    }

    /// Block until the start sequence completes, calling `pace` between
    /// polls. Fails as soon as the lifecycle leaves RUNNING.
    pub fn wait_for_start_condition(
        &self,
        detector: &mut StartDetector,
        mut pace: impl FnMut(),
    ) -> Result<(), StartAborted> {
        detector.reset();
        while self.shared.run_state() == RunState::Running {
            if detector.check(self.shared.orientation().tilt) == StartPhase::Ready {
                return Ok(());
            }
            pace();
        }
        Err(StartAborted)
    }

    #[inline]
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }
}
