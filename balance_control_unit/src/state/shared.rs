//! State shared between execution contexts.
//!
//! | Record | Guard | Writers |
//! |--------|-------|---------|
//! | [`OrientationState`] | `RwLock` | fast loop (estimate, outputs), battery sampler (`v_batt`) |
//! | [`Setpoint`] | `Mutex` | outer loop (`tilt`), supervisor (everything else) |
//! | `RunState` | `AtomicU8` | lifecycle events only |
//!
//! Every writer updates only its own fields in place, so a snapshot is never
//! torn within a record. Readers may see values one tick old.

use std::sync::atomic::{AtomicU8, Ordering};

use balance_common::consts::V_NOMINAL;
use balance_common::control_unit::state::{ControlState, RunState};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use super::lifecycle::{LifecycleEvent, TransitionResult, next_state};

/// Latest estimate and loop outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationState {
    pub tilt: f64,
    pub wheel_angle_l: f64,
    pub wheel_angle_r: f64,
    pub progression: f64,
    pub heading: f64,
    /// Plausibility-clamped pack voltage [V].
    pub v_batt: f64,
    pub d1_output: f64,
    pub d3_output: f64,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            tilt: 0.0,
            wheel_angle_l: 0.0,
            wheel_angle_r: 0.0,
            progression: 0.0,
            heading: 0.0,
            v_batt: V_NOMINAL,
            d1_output: 0.0,
            d3_output: 0.0,
        }
    }
}

/// Controller references and the control tag.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Setpoint {
    /// Written by D2, read by D1.
    pub tilt: f64,
    pub progression: f64,
    pub heading: f64,
    pub control: ControlState,
    /// Bumped on every engage. Loops reset their history when it changes.
    pub engage_epoch: u64,
}

/// Read-only view for the status reporter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub run_state: RunState,
    pub control: ControlState,
    pub tilt: f64,
    pub tilt_ref: f64,
    pub progression: f64,
    pub progression_ref: f64,
    pub heading: f64,
    pub d1_output: f64,
    pub d3_output: f64,
    pub v_batt: f64,
}

/// Everything the execution contexts share.
#[derive(Debug)]
pub struct SharedState {
    run_state: AtomicU8,
    orientation: RwLock<OrientationState>,
    setpoint: Mutex<Setpoint>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            run_state: AtomicU8::new(RunState::Uninitialized as u8),
            orientation: RwLock::new(OrientationState::default()),
            setpoint: Mutex::new(Setpoint::default()),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[inline]
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire)).unwrap_or(RunState::Exiting)
    }

    /// Apply a lifecycle event atomically.
    pub fn apply_lifecycle_event(&self, event: LifecycleEvent) -> TransitionResult {
        let mut result = TransitionResult::Rejected("unreachable");
        let _ = self
            .run_state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                let current = RunState::from_u8(raw).unwrap_or(RunState::Exiting);
                result = next_state(current, event);
                match result {
                    TransitionResult::Ok(next) => Some(next as u8),
                    TransitionResult::Rejected(_) => None,
                }
            });

        match &result {
            TransitionResult::Ok(next) => {
                info!(?event, state = next.label(), "Lifecycle transition")
            }
            TransitionResult::Rejected(reason) => {
                debug!(?event, reason, "Lifecycle event ignored")
            }
        }
        result
    }

    #[inline]
    pub fn is_exiting(&self) -> bool {
        self.run_state() == RunState::Exiting
    }

    // ── Orientation ────────────────────────────────────────────────

    #[inline]
    pub fn orientation(&self) -> OrientationState {
        *self.orientation.read()
    }

    /// Update fields in place under the write lock.
    #[inline]
    pub fn update_orientation(&self, f: impl FnOnce(&mut OrientationState)) {
        f(&mut self.orientation.write());
    }

    // ── Setpoint ───────────────────────────────────────────────────

    #[inline]
    pub fn setpoint(&self) -> Setpoint {
        *self.setpoint.lock()
    }

    /// Hold the setpoint lock for a read-modify-write.
    #[inline]
    pub fn lock_setpoint(&self) -> MutexGuard<'_, Setpoint> {
        self.setpoint.lock()
    }

    #[inline]
    pub fn control_state(&self) -> ControlState {
        self.setpoint.lock().control
    }

    // ── Status ─────────────────────────────────────────────────────

    pub fn snapshot(&self) -> StatusSnapshot {
        let o = self.orientation();
        let sp = self.setpoint();
        StatusSnapshot {
            run_state: self.run_state(),
            control: sp.control,
            tilt: o.tilt,
            tilt_ref: sp.tilt,
            progression: o.progression,
            progression_ref: sp.progression,
            heading: o.heading,
            d1_output: o.d1_output,
            d3_output: o.d3_output,
            v_batt: o.v_batt,
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_uninitialized_and_disengaged() {
        let s = SharedState::new();
        assert_eq!(s.run_state(), RunState::Uninitialized);
        assert_eq!(s.control_state(), ControlState::Disengaged);
        assert_eq!(s.orientation().v_batt, V_NOMINAL);
        assert_eq!(s.setpoint().engage_epoch, 0);
    }

    #[test]
    fn lifecycle_events_apply_and_reject() {
        let s = SharedState::new();
        assert_eq!(
            s.apply_lifecycle_event(LifecycleEvent::PauseToggle),
            TransitionResult::Rejected("not initialized")
        );
        assert_eq!(s.run_state(), RunState::Uninitialized);
        s.apply_lifecycle_event(LifecycleEvent::InitComplete);
        assert_eq!(s.run_state(), RunState::Running);
        s.apply_lifecycle_event(LifecycleEvent::Exit);
        assert!(s.is_exiting());
        assert!(matches!(
            s.apply_lifecycle_event(LifecycleEvent::PauseToggle),
            TransitionResult::Rejected(_)
        ));
    }

    #[test]
    fn concurrent_toggles_are_not_lost() {
        let s = Arc::new(SharedState::new());
        s.apply_lifecycle_event(LifecycleEvent::InitComplete);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        s.apply_lifecycle_event(LifecycleEvent::PauseToggle);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 1000 toggles: back where we started
        assert_eq!(s.run_state(), RunState::Running);
    }

    #[test]
    fn partial_updates_keep_other_fields() {
        let s = SharedState::new();
        s.update_orientation(|o| {
            o.tilt = 0.1;
            o.d1_output = 0.5;
        });
        s.update_orientation(|o| o.v_batt = 7.9);
        let o = s.orientation();
        assert_eq!(o.tilt, 0.1);
        assert_eq!(o.d1_output, 0.5);
        assert_eq!(o.v_batt, 7.9);
    }

    #[test]
    fn snapshot_combines_records() {
        let s = SharedState::new();
        s.update_orientation(|o| o.heading = 0.2);
        {
            let mut sp = s.lock_setpoint();
            sp.tilt = -0.05;
            sp.control = ControlState::Engaged;
        }
        let snap = s.snapshot();
        assert_eq!(snap.heading, 0.2);
        assert_eq!(snap.tilt_ref, -0.05);
        assert_eq!(snap.control, ControlState::Engaged);
        assert_eq!(snap.run_state, RunState::Uninitialized);
    }
}
