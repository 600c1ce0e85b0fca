//! Sustained actuator saturation detection.

/// Counts consecutive ticks at or above the saturation threshold.
///
/// Any tick below threshold restarts the count. Once the count reaches the
/// limit the monitor stays tripped until [`reset`](Self::reset).
#[derive(Debug, Clone, Copy)]
pub struct SaturationMonitor {
    threshold: f64,
    limit_ticks: u32,
    count: u32,
    tripped: bool,
}

impl SaturationMonitor {
    pub const fn new(threshold: f64, limit_ticks: u32) -> Self {
        Self {
            threshold,
            limit_ticks,
            count: 0,
            tripped: false,
        }
    }

    /// Feed one command; returns whether the monitor is tripped.
    #[inline]
    pub fn observe(&mut self, command: f64) -> bool {
        if command.abs() >= self.threshold {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        if self.count >= self.limit_ticks {
            self.tripped = true;
        }
        self.tripped
    }

    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
        self.tripped = false;
    }

    #[inline]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub const fn tripped(&self) -> bool {
        self.tripped
    }

    #[inline]
    pub const fn limit_ticks(&self) -> u32 {
        self.limit_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_exactly_limit_ticks() {
        let mut m = SaturationMonitor::new(0.95, 40);
        for _ in 0..39 {
            assert!(!m.observe(1.0));
        }
        assert!(m.observe(-0.95));
        assert!(m.tripped());
    }

    #[test]
    fn dip_below_threshold_restarts_count() {
        let mut m = SaturationMonitor::new(0.95, 40);
        for _ in 0..39 {
            m.observe(1.0);
        }
        assert!(!m.observe(0.94));
        assert_eq!(m.count(), 0);
        for _ in 0..39 {
            assert!(!m.observe(1.0));
        }
        assert!(m.observe(1.0));
    }

    #[test]
    fn trip_latches_until_reset() {
        let mut m = SaturationMonitor::new(0.95, 2);
        m.observe(1.0);
        assert!(m.observe(1.0));
        assert!(m.observe(0.0));
        m.reset();
        assert!(!m.tripped());
        assert_eq!(m.count(), 0);
        assert!(!m.observe(0.0));
    }
}
