//! Fixed-capacity history of recent samples.
//!
//! Age 0 is the newest value. Reading an age that was never written, or one
//! beyond capacity, yields `0.0`: a cold filter behaves as if it had seen
//! zeros forever.

use balance_common::consts::MAX_FILTER_TAPS;

/// Ring buffer of the last `capacity` samples. No allocation.
#[derive(Debug, Clone, Copy)]
pub struct DelayLine {
    buf: [f64; MAX_FILTER_TAPS],
    len: usize,
    head: usize,
}

impl DelayLine {
    /// Create a zeroed line. `capacity` is clamped to `1..=MAX_FILTER_TAPS`.
    pub const fn new(capacity: usize) -> Self {
        let len = if capacity == 0 {
            1
        } else if capacity > MAX_FILTER_TAPS {
            MAX_FILTER_TAPS
        } else {
            capacity
        };
        Self {
            buf: [0.0; MAX_FILTER_TAPS],
            len,
            head: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.len
    }

    /// Insert a new sample, dropping the oldest.
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.head = (self.head + 1) % self.len;
        self.buf[self.head] = value;
    }

    /// Sample inserted `age` pushes ago.
    #[inline]
    pub fn get(&self, age: usize) -> f64 {
        if age >= self.len {
            return 0.0;
        }
        self.buf[(self.head + self.len - age) % self.len]
    }

    #[inline]
    pub fn reset(&mut self) {
        self.buf = [0.0; MAX_FILTER_TAPS];
        self.head = 0;
    }
}
