//! Integration test: full scheduler against the simulation driver.
//!
//! The simulated operator picks the robot up off the ground and holds it
//! upright; the setpoint manager must detect that and engage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use balance_common::control_unit::config::BalanceConfig;
use balance_common::control_unit::state::{ControlState, RunState};
use balance_control_unit::scheduler::{Scheduler, SchedulerOptions};
use balance_control_unit::state::lifecycle::LifecycleEvent;
use balance_control_unit::state::shared::SharedState;
use balance_hal::builtin_registry;

#[test]
fn simulated_pickup_engages_and_exit_drains_contexts() {
    let mut config = BalanceConfig::default();
    config.safety.settle_time = 0.05;

    let registry = builtin_registry().unwrap();
    let mut driver = registry.create_driver("simulation").unwrap();
    let handles = driver.init(&config).unwrap();

    let shared = Arc::new(SharedState::new());
    let running = Scheduler::start(
        &config,
        Arc::clone(&shared),
        handles,
        SchedulerOptions { status: false },
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while shared.setpoint().engage_epoch == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    let engaged = shared.setpoint().engage_epoch >= 1;
    assert_eq!(shared.run_state(), RunState::Running);

    shared.apply_lifecycle_event(LifecycleEvent::Exit);
    let stats = running.join();
    driver.shutdown().unwrap();

    assert!(engaged, "start condition never detected");
    assert!(stats.cycle_count > 100);
    assert_eq!(shared.control_state(), ControlState::Disengaged);
}
