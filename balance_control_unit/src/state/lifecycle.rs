//! RunState transitions.
//!
//! Uninitialized → Running ↔ Paused, and any state → Exiting (terminal).

use balance_common::control_unit::state::RunState;

/// Result of a RunState transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, carrying the new state.
    Ok(RunState),
    /// Transition rejected, with the reason.
    Rejected(&'static str),
}

/// Lifecycle event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Hardware up and IMU settled.
    InitComplete,
    /// Short button press.
    PauseToggle,
    /// Long button press or process signal.
    Exit,
}

/// Compute the successor of `state` under `event`.
pub fn next_state(state: RunState, event: LifecycleEvent) -> TransitionResult {
    use LifecycleEvent::*;
    use RunState::*;

    let next = match (state, event) {
        (Exiting, _) => return TransitionResult::Rejected("already exiting"),
        (_, Exit) => Exiting,
        (Uninitialized, InitComplete) => Running,
        (Running, PauseToggle) => Paused,
        (Paused, PauseToggle) => Running,
        (Uninitialized, PauseToggle) => return TransitionResult::Rejected("not initialized"),
        (_, InitComplete) => return TransitionResult::Rejected("already initialized"),
    };
    TransitionResult::Ok(next)
}
