//! Fast cycle: estimate → gate → D1 → D3 → motors.
//!
//! [`FastLoop::tick`] runs once per IMU sample inside the driver's delivery
//! context. It never blocks on I/O and never allocates.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` once per process.
//! 2. Prefault stack pages.
//! 3. `SCHED_FIFO` with a per-context priority, set from inside each thread.
//!
//! All RT calls are no-ops without the `rt` feature.

use std::sync::Arc;
use std::time::{Duration, Instant};

use balance_common::control_unit::config::{BalanceConfig, WiringConfig};
use balance_common::hal::driver::{Encoders, Motors};
use balance_common::hal::types::ImuSample;

use crate::control::estimator::Estimator;
use crate::control::inner::InnerLoop;
use crate::control::steering::{SteeringLoop, wheel_commands};
use crate::error::SchedulerError;
use crate::state::shared::SharedState;
use crate::supervisor::{DisengageReason, Supervisor, TickGate};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that took longer than the sample period.
    pub overruns: u64,
    /// Maximum deviation of the sample interval from the period [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    #[inline]
    pub fn record_overrun(&mut self) {
        self.overruns += 1;
    }

    /// Average cycle time [ns] (returns 0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Fast Loop ──────────────────────────────────────────────────────

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// EXITING: motors disabled, loops skipped.
    Exit,
    /// Disengaged, nothing driven.
    Idle,
    /// The gates disengaged the controller this tick.
    Disengaged(DisengageReason),
    /// Duties sent to the motors (after polarity).
    Driven { left: f64, right: f64 },
}

/// State owned by the fast context.
pub struct FastLoop {
    shared: Arc<SharedState>,
    supervisor: Arc<Supervisor>,
    encoders: Arc<dyn Encoders>,
    motors: Arc<dyn Motors>,
    wiring: WiringConfig,
    estimator: Estimator,
    inner: InnerLoop,
    steering: SteeringLoop,
    epoch: u64,
    saturation_latched: bool,
    period: Duration,
    last_start: Option<Instant>,
    stats: CycleStats,
}

impl FastLoop {
    pub fn new(
        config: &BalanceConfig,
        shared: Arc<SharedState>,
        supervisor: Arc<Supervisor>,
        encoders: Arc<dyn Encoders>,
        motors: Arc<dyn Motors>,
    ) -> Self {
        Self {
            shared,
            supervisor,
            encoders,
            motors,
            wiring: config.wiring.clone(),
            estimator: Estimator::new(config),
            inner: InnerLoop::new(config),
            steering: SteeringLoop::new(config),
            epoch: 0,
            saturation_latched: false,
            period: Duration::from_secs_f64(config.rates.fast_dt()),
            last_start: None,
            stats: CycleStats::new(),
        }
    }

    /// One fast tick for one IMU sample.
    pub fn tick(&mut self, sample: &ImuSample) -> TickOutcome {
        let ticks_l = self.encoders.position(self.wiring.encoder_channel_l);
        let ticks_r = self.encoders.position(self.wiring.encoder_channel_r);
        let est = self.estimator.update(sample, ticks_l, ticks_r);

        let mut v_batt = 0.0;
        self.shared.update_orientation(|o| {
            o.tilt = est.tilt;
            o.wheel_angle_l = est.wheel_angle_l;
            o.wheel_angle_r = est.wheel_angle_r;
            o.progression = est.progression;
            o.heading = est.heading;
            v_batt = o.v_batt;
        });

        let sp = self.shared.setpoint();
        match self
            .supervisor
            .evaluate_tick(&sp, est.tilt, self.saturation_latched)
        {
            TickGate::Exit => return TickOutcome::Exit,
            TickGate::Idle => {
                self.saturation_latched = false;
                return TickOutcome::Idle;
            }
            TickGate::Disengaged(reason) => {
                self.saturation_latched = false;
                self.shared.update_orientation(|o| {
                    o.d1_output = 0.0;
                    o.d3_output = 0.0;
                });
                return TickOutcome::Disengaged(reason);
            }
            TickGate::Run => {}
        }

        if sp.engage_epoch != self.epoch {
            self.inner.reset();
            self.steering.reset();
            self.saturation_latched = false;
            self.epoch = sp.engage_epoch;
        }

        let d1 = self.inner.step(sp.tilt, est.tilt, v_batt);
        // Acted on by the gates of the next tick.
        self.saturation_latched = d1.saturation_fault;

        let correction = self.steering.step(sp.heading, est.heading);
        let (left, right) = wheel_commands(d1.command, correction, &self.wiring);
        self.motors.set_duty(self.wiring.motor_channel_l, left);
        self.motors.set_duty(self.wiring.motor_channel_r, right);

        self.shared.update_orientation(|o| {
            o.d1_output = d1.command;
            o.d3_output = correction;
        });

        TickOutcome::Driven { left, right }
    }

    /// [`tick`](Self::tick) with timing statistics.
    pub fn timed_tick(&mut self, sample: &ImuSample) -> TickOutcome {
        let start = Instant::now();
        let latency_ns = self.last_start.map_or(0, |prev| {
            let interval = start.duration_since(prev).as_nanos() as i64;
            (interval - self.period.as_nanos() as i64).abs()
        });
        self.last_start = Some(start);

        let outcome = self.tick(sample);

        let elapsed = start.elapsed();
        self.stats.record(elapsed.as_nanos() as i64, latency_ns);
        if elapsed > self.period {
            self.stats.record_overrun();
        }
        outcome
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn saturation_latched(&self) -> bool {
        self.saturation_latched
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), SchedulerError> {
    use nix::sys::mman::{MlockAllFlags, mlockall};
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(|e| SchedulerError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), SchedulerError> {
    Ok(())
}

/// Touch stack pages so the first ticks do not fault.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Process-wide RT preparation. Call once before spawning contexts.
pub fn rt_setup() -> Result<(), SchedulerError> {
    rt_mlockall()?;
    prefault_stack();
    Ok(())
}

/// Give the calling thread `SCHED_FIFO` at `priority`.
#[cfg(feature = "rt")]
pub fn rt_set_thread_priority(priority: i32) -> Result<(), SchedulerError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: pthread_self() is always valid for the calling thread and
    // `param` outlives the call.
    let ret =
        unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::from_raw_os_error(ret);
        return Err(SchedulerError::RtSetup(format!(
            "pthread_setschedparam(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn rt_set_thread_priority(_priority: i32) -> Result<(), SchedulerError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_track_min_max_avg() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.avg_cycle_ns(), 0);
        stats.record(100, 5);
        stats.record(300, 2);
        stats.record(200, 9);
        assert_eq!(stats.cycle_count, 3);
        assert_eq!(stats.min_cycle_ns, 100);
        assert_eq!(stats.max_cycle_ns, 300);
        assert_eq!(stats.avg_cycle_ns(), 200);
        assert_eq!(stats.last_cycle_ns, 200);
        assert_eq!(stats.max_latency_ns, 9);
        stats.record_overrun();
        assert_eq!(stats.overruns, 1);
    }

    #[test]
    fn rt_calls_are_noops_without_feature() {
        #[cfg(not(feature = "rt"))]
        {
            assert!(rt_setup().is_ok());
            assert!(rt_set_thread_priority(80).is_ok());
        }
    }
}
