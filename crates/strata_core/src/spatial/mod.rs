//! Spatial indexing for broad-phase object queries.
//!
//! Two independent structures answer "what is near this point/rectangle?"
//! without scanning every object every step:
//!
//! - [`BoundedGrid`]: fixed array of cells over a finite world. Each object
//!   occupies exactly one cell (its representative point).
//! - [`SparseHashGrid`]: lazily created cells over an unbounded world. Each
//!   object occupies every cell its bounding rectangle overlaps, and keeps a
//!   reverse index of those cells for cheap removal and update.
//!
//! Both hold caller handles, never the objects. Objects enter through an
//! explicit add, move through update and leave through remove; the caller
//! pairs remove with the object's own lifecycle.
//!
//! Queries write into a result set owned by the grid and return it by
//! borrow, so a result cannot outlive the next call on the same grid.
//! Visitor forms (`for_each_*`) materialise nothing.

mod bounded_grid;
mod cell;
mod error;
mod hash_grid;
mod metrics;

pub use bounded_grid::{BoundedGrid, GridCell, GridDimensions};
pub use cell::{CellCoord, CellRange};
pub use error::SpatialError;
pub use hash_grid::{HashCell, MissingCells, SparseHashGrid};
pub use metrics::SpatialMetricsSnapshot;

use crate::math::Rect;
use std::hash::Hash;

/// Capability required by [`BoundedGrid`]: a handle plus a cell coordinate
/// slot that only the grid writes.
///
/// `grid_cell` is `None` until the object is inserted and again after it is
/// removed.
pub trait GridOccupant {
    type Handle: Copy + Eq + Hash;

    fn handle(&self) -> Self::Handle;

    fn grid_cell(&self) -> Option<CellCoord>;

    fn set_grid_cell(&mut self, cell: Option<CellCoord>);
}

/// Capability required by [`SparseHashGrid`]: a handle plus the object's
/// current axis-aligned bounding rectangle. The grid never mutates it.
pub trait Bounded {
    type Handle: Copy + Eq + Hash;

    fn handle(&self) -> Self::Handle;

    fn bounds(&self) -> Rect;
}

/// Ad-hoc pairing for callers that track bounds outside a dedicated type.
impl<H: Copy + Eq + Hash> Bounded for (H, Rect) {
    type Handle = H;

    fn handle(&self) -> H {
        self.0
    }

    fn bounds(&self) -> Rect {
        self.1
    }
}
