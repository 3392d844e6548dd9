//! Cell coordinates and inclusive coordinate ranges.

use crate::math::{Rect, Vec2};
use std::fmt;

/// Integer coordinate of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Floor-divide a world position by the cell size.
    #[inline]
    pub fn from_position(position: Vec2, cell_size: Vec2) -> Self {
        Self::new(
            (position.x / cell_size.x).floor() as i32,
            (position.y / cell_size.y).floor() as i32,
        )
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive rectangle of cell coordinates, `min` to `max` on both axes.
///
/// Empty when `max` lies before `min` on either axis (e.g. a rectangle with
/// negative size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRange {
    /// Cells touched by `rect`: its top-left and bottom-right corners
    /// floor-divided by `cell_size`.
    pub fn of_rect(rect: &Rect, cell_size: Vec2) -> Self {
        Self {
            min: CellCoord::from_position(rect.top_left(), cell_size),
            max: CellCoord::from_position(rect.bottom_right(), cell_size),
        }
    }

    /// Check if the range holds no coordinates.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    /// Number of coordinates in the range.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let w = (self.max.x as i64 - self.min.x as i64 + 1) as u64;
        let h = (self.max.y as i64 - self.min.y as i64 + 1) as u64;
        w.saturating_mul(h)
    }

    /// Check if `coord` lies inside the range.
    #[inline]
    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.min.x..=self.max.x).contains(&coord.x) && (self.min.y..=self.max.y).contains(&coord.y)
    }

    /// Row-major walk over every coordinate in the range.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| CellCoord::new(x, y)))
    }
}
