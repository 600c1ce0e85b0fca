//! Simulated peripherals.
//!
//! All peripherals share one [`SimWorld`] behind a mutex: the IMU thread
//! advances it, the controller reads encoders and writes motor duty into it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use balance_common::control_unit::config::{MechanicsConfig, WiringConfig};
use balance_common::prelude::*;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::hand::{Hand, HandParams, HandPhase};
use super::plant::{PendulumPlant, PlantParams};

/// Number of motor/encoder channels on the board (1-based).
pub const CHANNELS: usize = 4;

const GRAVITY: f64 = 9.80665;
const PACK_VOLTAGE: f64 = 7.8;
const SAG_PER_DUTY: f64 = 0.4;

/// Everything the simulated robot knows about itself.
pub struct SimWorld {
    plant: PendulumPlant,
    hand: Hand,
    mechanics: MechanicsConfig,
    wiring: WiringConfig,
    v_nominal: f64,
    duty: [f64; CHANNELS + 1],
    motors_enabled: bool,
    encoder_offset: [i64; CHANNELS + 1],
}

impl SimWorld {
    /// Build the world for the given robot configuration.
    pub fn new(config: &BalanceConfig, plant: PlantParams, hand: HandParams) -> Self {
        Self {
            plant: PendulumPlant::new(plant),
            hand: Hand::new(hand),
            mechanics: config.mechanics.clone(),
            wiring: config.wiring.clone(),
            v_nominal: config.battery.v_nominal,
            duty: [0.0; CHANNELS + 1],
            motors_enabled: false,
            encoder_offset: [0; CHANNELS + 1],
        }
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        let drive = if self.motors_enabled {
            let scale = self.voltage() / self.v_nominal;
            [
                self.duty_at(self.wiring.motor_channel_l)
                    * f64::from(self.wiring.motor_polarity_l)
                    * scale,
                self.duty_at(self.wiring.motor_channel_r)
                    * f64::from(self.wiring.motor_polarity_r)
                    * scale,
            ]
        } else {
            [0.0, 0.0]
        };

        if self.hand.act(&mut self.plant, self.motors_enabled, dt) {
            self.plant.step_wheels([0.0, 0.0], dt);
        } else {
            self.plant.step(drive, dt);
        }
    }

    /// Current IMU reading.
    pub fn imu_sample(&self) -> ImuSample {
        let sensor = self.plant.tilt() - self.mechanics.mount_angle;
        ImuSample::new(
            [0.0, GRAVITY * sensor.cos(), -GRAVITY * sensor.sin()],
            [self.plant.tilt_rate().to_degrees(), 0.0, 0.0],
        )
    }

    /// True body tilt [rad].
    pub fn tilt(&self) -> f64 {
        self.plant.tilt()
    }

    /// Phase of the operator script.
    pub fn hand_phase(&self) -> HandPhase {
        self.hand.phase()
    }

    fn duty_at(&self, channel: u8) -> f64 {
        self.duty.get(channel as usize).copied().unwrap_or(0.0)
    }

    fn encoder_side(&self, channel: u8) -> Option<(usize, i8)> {
        if channel == self.wiring.encoder_channel_l {
            Some((0, self.wiring.encoder_polarity_l))
        } else if channel == self.wiring.encoder_channel_r {
            Some((1, self.wiring.encoder_polarity_r))
        } else {
            None
        }
    }

    fn raw_ticks(&self, channel: u8) -> i64 {
        let Some((side, polarity)) = self.encoder_side(channel) else {
            return 0;
        };
        let counts_per_rad =
            self.mechanics.gearbox * self.mechanics.encoder_res / core::f64::consts::TAU;
        (self.plant.wheel_angle(side) * f64::from(polarity) * counts_per_rad).round() as i64
    }

    fn voltage(&self) -> f64 {
        if !self.motors_enabled {
            return PACK_VOLTAGE;
        }
        let load = self.duty.iter().map(|d| d.abs()).sum::<f64>() / 2.0;
        PACK_VOLTAGE - SAG_PER_DUTY * load.min(1.0)
    }
}

/// Encoders, motors, battery, button and LEDs of the simulated board.
pub struct SimDevices {
    world: Arc<Mutex<SimWorld>>,
    button: AtomicBool,
    red: AtomicBool,
    green: AtomicBool,
}

impl SimDevices {
    /// Wrap a shared world.
    pub fn new(world: Arc<Mutex<SimWorld>>) -> Self {
        Self {
            world,
            button: AtomicBool::new(false),
            red: AtomicBool::new(false),
            green: AtomicBool::new(false),
        }
    }

    /// Press or release the simulated button.
    pub fn set_button(&self, pressed: bool) {
        self.button.store(pressed, Ordering::Release);
    }

    /// Current LED level.
    pub fn led(&self, led: Led) -> bool {
        match led {
            Led::Red => self.red.load(Ordering::Acquire),
            Led::Green => self.green.load(Ordering::Acquire),
        }
    }

    /// Shared world, for inspection.
    pub fn world(&self) -> &Arc<Mutex<SimWorld>> {
        &self.world
    }
}

impl Encoders for SimDevices {
    fn position(&self, channel: u8) -> i64 {
        let world = self.world.lock();
        let offset = world
            .encoder_offset
            .get(channel as usize)
            .copied()
            .unwrap_or(0);
        world.raw_ticks(channel) - offset
    }

    fn set_position(&self, channel: u8, value: i64) {
        let mut world = self.world.lock();
        let raw = world.raw_ticks(channel);
        if let Some(slot) = world.encoder_offset.get_mut(channel as usize) {
            *slot = raw - value;
        }
    }
}

impl Motors for SimDevices {
    fn set_duty(&self, channel: u8, duty: f64) {
        let mut world = self.world.lock();
        if let Some(slot) = world.duty.get_mut(channel as usize) {
            *slot = duty.clamp(-1.0, 1.0);
        }
    }

    fn set_all(&self, duty: f64) {
        let mut world = self.world.lock();
        world.duty = [duty.clamp(-1.0, 1.0); CHANNELS + 1];
    }

    fn enable(&self) {
        self.world.lock().motors_enabled = true;
        debug!("Simulated motors enabled");
    }

    fn disable(&self) {
        self.world.lock().motors_enabled = false;
        debug!("Simulated motors disabled");
    }
}

impl VoltageSensor for SimDevices {
    fn read_volts(&self) -> f64 {
        self.world.lock().voltage()
    }
}

impl Button for SimDevices {
    fn is_pressed(&self) -> bool {
        self.button.load(Ordering::Acquire)
    }
}

impl Indicator for SimDevices {
    fn set_led(&self, led: Led, on: bool) {
        let slot = match led {
            Led::Red => &self.red,
            Led::Green => &self.green,
        };
        if slot.swap(on, Ordering::AcqRel) != on {
            debug!(?led, on, "LED changed");
        }
    }
}

/// Timer thread that advances the world and delivers IMU samples.
pub struct SimImu {
    world: Arc<Mutex<SimWorld>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimImu {
    /// Create a stopped IMU over a shared world.
    pub fn new(world: Arc<Mutex<SimWorld>>) -> Self {
        Self {
            world,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl ImuSource for SimImu {
    fn start(&mut self, rate_hz: u32, mut handler: SampleHandler) -> Result<(), HalError> {
        if self.thread.is_some() {
            return Err(HalError::AlreadyStarted);
        }
        if rate_hz == 0 {
            return Err(HalError::ConfigError("IMU rate must be positive".to_string()));
        }

        let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz));
        let dt = period.as_secs_f64();
        let world = Arc::clone(&self.world);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        let thread = std::thread::Builder::new()
            .name("sim-imu".to_string())
            .spawn(move || {
                let mut next = Instant::now() + period;
                while running.load(Ordering::Acquire) {
                    let sample = {
                        let mut world = world.lock();
                        world.advance(dt);
                        world.imu_sample()
                    };
                    handler(&sample);

                    let now = Instant::now();
                    if next > now {
                        std::thread::sleep(next - now);
                    }
                    next += period;
                }
            })
            .map_err(|e| HalError::InitFailed(format!("IMU thread: {e}")))?;

        self.thread = Some(thread);
        info!(rate_hz, "Simulated IMU started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            info!("Simulated IMU stopped");
        }
    }
}

impl Drop for SimImu {
    fn drop(&mut self) {
        self.stop();
    }
}
