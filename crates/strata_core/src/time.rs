//! Deterministic time system
//!
//! Fixed tick rate; the spatial index is updated and queried once per tick.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Simulation time tracker
pub struct SimulationTime {
    tick_duration: Duration,
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    /// A zero rate falls back to [`DEFAULT_TICK_RATE_HZ`].
    pub fn new(tick_rate_hz: u32) -> Self {
        let rate = if tick_rate_hz == 0 {
            DEFAULT_TICK_RATE_HZ
        } else {
            tick_rate_hz
        };
        Self {
            tick_duration: Duration::from_secs(1) / rate,
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Tick length in seconds, for integrating velocities.
    pub fn delta_seconds(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}
