//! Strata Metrics - instrumentation for the simulation step
//!
//! Counters and step timing that completely vanish in production builds via
//! feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use strata_metrics::{Counter, StepTimer};
//!
//! let mut timer = StepTimer::new(60); // Track last 60 steps
//! timer.begin();
//! // ... update and query the spatial index ...
//! timer.end();
//! println!("step: {:.3} ms", timer.step_time_ms());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod step_timer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use step_timer::StepTimer;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
///
/// The `cfg` is evaluated in the calling crate, so callers forward their own
/// `metrics` feature to `strata_metrics/metrics`.
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default, Clone)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &'static str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct StepTimer;

#[cfg(not(feature = "metrics"))]
impl StepTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn step_time_ms(&self) -> f64 { 0.0 }
    pub fn step_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn samples(&self) -> usize { 0 }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_counter_and_timer_construct() {
        // Holds for both the real types and the stubs
        let mut counter = super::Counter::new();
        counter.increment("queries", 1);
        let mut timer = super::StepTimer::new(8);
        timer.begin();
        timer.end();
        assert!(timer.step_time_ms() >= 0.0);
    }
}
