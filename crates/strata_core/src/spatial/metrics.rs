//! Per-grid event counters, compiled to no-ops without the `metrics` feature.

use strata_metrics::Counter;

const QUERIES: &str = "queries";
const CANDIDATES: &str = "candidates";
const CELLS_CREATED: &str = "cells_created";
const MOVES: &str = "moves";

/// Counts accumulated by one grid since construction or the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpatialMetricsSnapshot {
    pub queries: u64,
    /// Objects examined by queries before deduplication and exact testing.
    pub candidates: u64,
    pub cells_created: u64,
    /// Membership changes (bounded grid cell changes, hash grid rebuilds).
    pub moves: u64,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct SpatialMetrics {
    counter: Counter,
}

impl SpatialMetrics {
    pub(crate) fn record_query(&mut self, candidates: u64) {
        self.counter.increment(QUERIES, 1);
        self.counter.increment(CANDIDATES, candidates);
    }

    pub(crate) fn record_cells_created(&mut self, count: u64) {
        self.counter.increment(CELLS_CREATED, count);
    }

    pub(crate) fn record_move(&mut self) {
        self.counter.increment(MOVES, 1);
    }

    pub(crate) fn snapshot(&self) -> SpatialMetricsSnapshot {
        SpatialMetricsSnapshot {
            queries: self.counter.get(QUERIES),
            candidates: self.counter.get(CANDIDATES),
            cells_created: self.counter.get(CELLS_CREATED),
            moves: self.counter.get(MOVES),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.counter.reset_all();
    }
}
