//! Execution contexts.
//!
//! | Context | Rate | Work |
//! |---------|------|------|
//! | fast (driver IMU delivery) | `fast_hz` | [`FastLoop::tick`] |
//! | `outer` | `outer_hz` | [`OuterLoopTask::run_once`] |
//! | `setpoint` | `setpoint_manager_hz` | settle, start detection, engage |
//! | `battery` | `battery_hz` | [`BatteryMonitor::sample`] |
//! | `panel` | `panel_hz` | button events, LEDs |
//! | `status` | `status_hz` | console row (terminal only) |
//!
//! Every thread paces itself on absolute deadlines and checks for EXITING
//! once per period. EXITING is the only stop signal.

use std::io::IsTerminal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use balance_common::control_unit::config::BalanceConfig;
use balance_common::control_unit::state::RunState;
use balance_common::hal::driver::{Button, HalHandles, ImuSource, Motors, SampleHandler};
use balance_common::hal::types::ImuSample;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::battery::BatteryMonitor;
use crate::button::{ButtonMonitor, LedPolicy};
use crate::control::outer::OuterLoopTask;
use crate::cycle::{CycleStats, FastLoop, rt_set_thread_priority};
use crate::error::SchedulerError;
use crate::safety::start::StartDetector;
use crate::state::lifecycle::LifecycleEvent;
use crate::state::shared::SharedState;
use crate::status::StatusPrinter;
use crate::supervisor::{DisengageReason, Supervisor};

/// Startup switches not covered by the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Run the console status context (still requires a terminal).
    pub status: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self { status: true }
    }
}

/// Builds and starts every execution context.
pub struct Scheduler;

impl Scheduler {
    /// Spawn the periodic contexts, then start IMU delivery.
    ///
    /// If delivery cannot be started the process is moved to EXITING and
    /// the already spawned contexts are joined before the error is returned.
    pub fn start(
        config: &BalanceConfig,
        shared: Arc<SharedState>,
        handles: HalHandles,
        options: SchedulerOptions,
    ) -> Result<RunningScheduler, SchedulerError> {
        let HalHandles {
            mut imu,
            encoders,
            motors,
            voltage,
            button,
            leds,
        } = handles;

        motors.set_all(0.0);
        motors.disable();

        let supervisor = Arc::new(Supervisor::new(
            config,
            Arc::clone(&shared),
            Arc::clone(&motors),
            Arc::clone(&encoders),
        ));

        let mut battery = BatteryMonitor::new(&config.battery, voltage);
        battery.sample(&shared);

        let mut threads = Vec::new();
        let spawned = Self::spawn_contexts(
            config,
            &shared,
            &supervisor,
            battery,
            button,
            LedPolicy::new(leds),
            options,
            &mut threads,
        );
        if let Err(e) = spawned {
            shared.apply_lifecycle_event(LifecycleEvent::Exit);
            join_all(threads);
            return Err(e);
        }

        let fast = Arc::new(Mutex::new(FastLoop::new(
            config,
            Arc::clone(&shared),
            Arc::clone(&supervisor),
            encoders,
            Arc::clone(&motors),
        )));
        let skipped = Arc::new(AtomicU64::new(0));
        let handler = fast_handler(
            Arc::clone(&fast),
            Arc::clone(&skipped),
            config.priorities.fast,
        );

        if let Err(e) = imu.start(config.rates.fast_hz, handler) {
            shared.apply_lifecycle_event(LifecycleEvent::Exit);
            join_all(threads);
            motors.disable();
            return Err(e.into());
        }
        info!(
            fast_hz = config.rates.fast_hz,
            outer_hz = config.rates.outer_hz,
            contexts = threads.len() + 1,
            "Scheduler started"
        );

        Ok(RunningScheduler {
            shared,
            imu,
            motors,
            fast,
            skipped,
            threads,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_contexts(
        config: &BalanceConfig,
        shared: &Arc<SharedState>,
        supervisor: &Arc<Supervisor>,
        mut battery: BatteryMonitor,
        button: Arc<dyn Button>,
        mut leds: LedPolicy,
        options: SchedulerOptions,
        threads: &mut Vec<(&'static str, JoinHandle<()>)>,
    ) -> Result<(), SchedulerError> {
        let rates = &config.rates;
        let prio = &config.priorities;

        let mut outer = OuterLoopTask::new(config);
        let s = Arc::clone(shared);
        threads.push(spawn_periodic(
            "outer",
            rates.outer_hz,
            prio.outer,
            Arc::clone(shared),
            move || {
                if s.run_state() == RunState::Running {
                    outer.run_once(&s);
                }
            },
        )?);

        let s = Arc::clone(shared);
        threads.push(spawn_periodic(
            "battery",
            rates.battery_hz,
            prio.battery,
            Arc::clone(shared),
            move || {
                battery.sample(&s);
            },
        )?);

        let s = Arc::clone(shared);
        let mut monitor = ButtonMonitor::new(&config.button);
        let panel_dt = 1.0 / f64::from(rates.panel_hz);
        threads.push(spawn_periodic(
            "panel",
            rates.panel_hz,
            prio.panel,
            Arc::clone(shared),
            move || {
                if let Some(event) = monitor.update(button.is_pressed(), panel_dt) {
                    s.apply_lifecycle_event(event);
                }
                if s.is_exiting() {
                    leds.clear();
                } else {
                    leds.apply(s.run_state(), s.control_state());
                }
            },
        )?);

        if options.status && std::io::stdout().is_terminal() {
            let s = Arc::clone(shared);
            let mut printer = StatusPrinter::new();
            threads.push(spawn_periodic(
                "status",
                rates.status_hz,
                prio.status,
                Arc::clone(shared),
                move || {
                    let mut out = std::io::stdout().lock();
                    if let Err(e) = printer.render(&mut out, &s.snapshot()) {
                        debug!("status write failed: {e}");
                    }
                },
            )?);
        } else {
            debug!("Status reporter disabled");
        }

        let sup = Arc::clone(supervisor);
        let manager = SetpointManager::new(config, sup);
        threads.push(spawn_named("setpoint", prio.setpoint_manager, move || manager.run())?);

        Ok(())
    }
}

/// Handle on the started contexts.
pub struct RunningScheduler {
    shared: Arc<SharedState>,
    imu: Box<dyn ImuSource>,
    motors: Arc<dyn Motors>,
    fast: Arc<Mutex<FastLoop>>,
    skipped: Arc<AtomicU64>,
    threads: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningScheduler {
    #[inline]
    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Wait for EXITING to drain every context, stop IMU delivery and return
    /// the fast-loop statistics.
    pub fn join(mut self) -> CycleStats {
        join_all(std::mem::take(&mut self.threads));
        self.imu.stop();
        self.motors.set_all(0.0);
        self.motors.disable();

        let mut stats = self.fast.lock().stats().clone();
        stats.overruns += self.skipped.load(Ordering::Relaxed);
        info!(
            cycles = stats.cycle_count,
            min_ns = if stats.cycle_count == 0 { 0 } else { stats.min_cycle_ns },
            max_ns = stats.max_cycle_ns,
            avg_ns = stats.avg_cycle_ns(),
            max_latency_ns = stats.max_latency_ns,
            overruns = stats.overruns,
            "Fast loop statistics"
        );
        stats
    }
}

// ─── Setpoint Manager ───────────────────────────────────────────────

/// Settles the IMU, then engages whenever a start sequence completes.
struct SetpointManager {
    supervisor: Arc<Supervisor>,
    detector: StartDetector,
    settle: Duration,
    period: Duration,
}

impl SetpointManager {
    fn new(config: &BalanceConfig, supervisor: Arc<Supervisor>) -> Self {
        Self {
            supervisor,
            detector: StartDetector::new(&config.safety),
            settle: Duration::from_secs_f64(config.safety.settle_time),
            period: period_of(config.rates.setpoint_manager_hz),
        }
    }

    fn run(mut self) {
        let shared = Arc::clone(self.supervisor.shared());

        let settle_end = Instant::now() + self.settle;
        while Instant::now() < settle_end {
            if shared.is_exiting() {
                self.supervisor.disengage(DisengageReason::Exiting);
                return;
            }
            thread::sleep(self.period);
        }
        shared.apply_lifecycle_event(LifecycleEvent::InitComplete);

        let poll = self.detector.poll_period();
        let mut next = Instant::now();
        loop {
            match shared.run_state() {
                RunState::Exiting => {
                    self.supervisor.disengage(DisengageReason::Exiting);
                    return;
                }
                RunState::Running if !shared.control_state().is_engaged() => {
                    info!("Waiting for start condition");
                    match self
                        .supervisor
                        .wait_for_start_condition(&mut self.detector, || thread::sleep(poll))
                    {
                        Ok(()) => {
                            self.supervisor.engage();
                        }
                        Err(e) => {
                            debug!("{e}");
                            self.supervisor.zero_out();
                        }
                    }
                    next = Instant::now();
                }
                _ => {}
            }
            next = sleep_until(next, self.period);
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn fast_handler(
    fast: Arc<Mutex<FastLoop>>,
    skipped: Arc<AtomicU64>,
    priority: i32,
) -> SampleHandler {
    let mut priority_set = false;
    Box::new(move |sample: &ImuSample| {
        if !priority_set {
            priority_set = true;
            if let Err(e) = rt_set_thread_priority(priority) {
                warn!("fast context: {e}");
            }
        }
        match fast.try_lock() {
            Some(mut fast) => {
                fast.timed_tick(sample);
            }
            None => {
                skipped.fetch_add(1, Ordering::Relaxed);
                error!("Fast tick re-entered, sample dropped");
            }
        }
    })
}

fn period_of(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(hz.max(1)))
}

/// Sleep to the next absolute deadline. A missed deadline restarts the
/// schedule from now instead of bursting to catch up.
fn sleep_until(previous: Instant, period: Duration) -> Instant {
    let next = previous + period;
    let now = Instant::now();
    if next > now {
        thread::sleep(next - now);
        next
    } else {
        now
    }
}

fn spawn_named(
    name: &'static str,
    priority: i32,
    body: impl FnOnce() + Send + 'static,
) -> Result<(&'static str, JoinHandle<()>), SchedulerError> {
    let handle = thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            if let Err(e) = rt_set_thread_priority(priority) {
                warn!("{name} context: {e}");
            }
            debug!(context = name, priority, "Context started");
            body();
            debug!(context = name, "Context stopped");
        })
        .map_err(|source| SchedulerError::Spawn { context: name, source })?;
    Ok((name, handle))
}

fn spawn_periodic(
    name: &'static str,
    hz: u32,
    priority: i32,
    shared: Arc<SharedState>,
    mut body: impl FnMut() + Send + 'static,
) -> Result<(&'static str, JoinHandle<()>), SchedulerError> {
    let period = period_of(hz);
    spawn_named(name, priority, move || {
        let mut next = Instant::now();
        loop {
            let exiting = shared.is_exiting();
            body();
            if exiting {
                break;
            }
            next = sleep_until(next, period);
        }
    })
}

fn join_all(threads: Vec<(&'static str, JoinHandle<()>)>) {
    for (name, handle) in threads {
        if handle.join().is_err() {
            error!("{name} context panicked");
        }
    }
}
