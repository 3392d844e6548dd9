//! Simulation step timing with a rolling window

use std::time::{Duration, Instant};

/// Rolling average of the last `capacity` step durations.
#[derive(Debug)]
pub struct StepTimer {
    step_start: Instant,
    samples: Vec<Duration>,
    capacity: usize,
    index: usize,
}

impl StepTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            step_start: Instant::now(),
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    pub fn begin(&mut self) {
        self.step_start = Instant::now();
    }

    pub fn end(&mut self) {
        let elapsed = self.step_start.elapsed();
        if self.samples.len() < self.capacity {
            self.samples.push(elapsed);
        } else {
            self.samples[self.index] = elapsed;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    pub fn samples(&self) -> usize {
        self.samples.len()
    }

    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn step_time_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }

    pub fn step_time_range_ms(&self) -> (f64, f64) {
        let min = self.samples.iter().min().copied().unwrap_or(Duration::ZERO);
        let max = self.samples.iter().max().copied().unwrap_or(Duration::ZERO);
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
