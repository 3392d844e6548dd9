//! Sparse hash grid with per-object bounding rectangles.
//!
//! Cells are created on first use and never removed. Each indexed object
//! keeps the ordered list of cells it occupies (the reverse index), so
//! update and removal touch only those cells instead of scanning the map.
//!
//! Invariant: with [`MissingCells::Create`], an object's cell list equals
//! `CellRange::of_rect(bounds)` for the bounds it was last indexed with, and
//! every listed cell holds the object exactly once.

use super::metrics::SpatialMetrics;
use super::{Bounded, CellCoord, CellRange, SpatialError, SpatialMetricsSnapshot};
use crate::math::{Rect, Vec2};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Whether a membership rebuild may create cells that do not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCells {
    Create,
    /// Only join cells that already exist.
    Skip,
}

/// One cell of a [`SparseHashGrid`].
#[derive(Debug, Clone)]
pub struct HashCell<H> {
    members: Vec<H>,
}

impl<H> HashCell<H> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Handles listed in this cell, each at most once.
    pub fn members(&self) -> &[H] {
        &self.members
    }

    /// Number of objects in this cell.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the cell holds no objects. Empty cells stay in the map.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Reverse-index entry.
#[derive(Debug, Clone)]
struct IndexedObject {
    /// Bounds as of the last add/update; queries test against these.
    bounds: Rect,
    cells: Vec<CellCoord>,
}

/// Rectangle-membership spatial index over an unbounded world.
pub struct SparseHashGrid<H> {
    cell_size: Vec2,
    cells: HashMap<CellCoord, HashCell<H>>,
    objects: HashMap<H, IndexedObject>,
    query_results: HashSet<H>,
    cell_results: HashSet<CellCoord>,
    metrics: SpatialMetrics,
}

impl<H: Copy + Eq + Hash> SparseHashGrid<H> {
    /// Create an empty grid. Cells are created lazily.
    pub fn new(cell_size: Vec2) -> Result<Self, SpatialError> {
        if !(cell_size.x > 0.0 && cell_size.y > 0.0 && cell_size.is_finite()) {
            return Err(SpatialError::InvalidDimensions {
                reason: "cell width and height must be positive and finite",
            });
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            objects: HashMap::new(),
            query_results: HashSet::new(),
            cell_results: HashSet::new(),
            metrics: SpatialMetrics::default(),
        })
    }

    /// Cell extent in world units.
    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if no object is indexed.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Check if `handle` is indexed.
    pub fn contains(&self, handle: H) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Cells created so far, empty ones included.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell at `coord`, if it has been created.
    pub fn cell(&self, coord: CellCoord) -> Option<&HashCell<H>> {
        self.cells.get(&coord)
    }

    /// Bounds the object was last indexed with.
    pub fn indexed_bounds(&self, handle: H) -> Option<Rect> {
        self.objects.get(&handle).map(|object| object.bounds)
    }

    /// Every cell coordinate touched by `rect`.
    #[inline]
    pub fn cell_range(&self, rect: &Rect) -> CellRange {
        CellRange::of_rect(rect, self.cell_size)
    }

    /// Register an object and place it in every cell its bounds touch,
    /// creating cells as needed. Non-finite bounds are rejected and nothing
    /// is registered.
    pub fn add_object<O>(&mut self, object: &O) -> Result<(), SpatialError>
    where
        O: Bounded<Handle = H>,
    {
        let handle = object.handle();
        if self.objects.contains_key(&handle) {
            tracing::debug!("rejected duplicate add to sparse hash grid");
            return Err(SpatialError::AlreadyIndexed);
        }
        let bounds = checked_bounds(object)?;
        self.objects.insert(
            handle,
            IndexedObject {
                bounds,
                cells: Vec::new(),
            },
        );
        self.update_object_cells(object, MissingCells::Create)
    }

    /// Rebuild an object's membership from its current bounds.
    ///
    /// Membership is cleared and rebuilt rather than diffed, so repeating the
    /// call with unchanged bounds leaves the grid as it was. Non-finite
    /// bounds are rejected before the old membership is touched.
    pub fn update_object_cells<O>(
        &mut self,
        object: &O,
        missing: MissingCells,
    ) -> Result<(), SpatialError>
    where
        O: Bounded<Handle = H>,
    {
        let handle = object.handle();
        let bounds = checked_bounds(object)?;
        let range = self.cell_range(&bounds);

        let entry = self.objects.get_mut(&handle).ok_or(SpatialError::NotIndexed)?;
        detach(&mut self.cells, handle, &entry.cells);
        entry.cells.clear();
        entry.bounds = bounds;

        let mut created = 0;
        for coord in range.iter() {
            let cell = match self.cells.entry(coord) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => match missing {
                    MissingCells::Create => {
                        tracing::trace!(%coord, "hash cell created");
                        created += 1;
                        vacant.insert(HashCell::new())
                    }
                    MissingCells::Skip => continue,
                },
            };
            cell.members.push(handle);
            entry.cells.push(coord);
        }

        self.metrics.record_cells_created(created);
        self.metrics.record_move();
        Ok(())
    }

    /// Drop an object from every cell it occupies. Returns `false` (and does
    /// nothing) when the object is not indexed.
    pub fn remove_object(&mut self, handle: H) -> bool {
        match self.objects.remove(&handle) {
            Some(object) => {
                detach(&mut self.cells, handle, &object.cells);
                true
            }
            None => false,
        }
    }

    /// Objects whose indexed bounds strictly intersect `rect`, minus
    /// `exclude`. The returned set is reused by the next rectangle query.
    pub fn intersects_rect(&mut self, rect: Rect, exclude: Option<H>) -> &HashSet<H> {
        let mut results = std::mem::take(&mut self.query_results);
        results.clear();
        let candidates = self.visit_intersecting(&rect, exclude, |handle| {
            results.insert(handle);
        });
        self.metrics.record_query(candidates);
        self.query_results = results;
        &self.query_results
    }

    /// [`intersects_rect`](Self::intersects_rect) with the object's current
    /// bounds, excluding the object itself.
    pub fn intersects_object<O>(&mut self, object: &O) -> &HashSet<H>
    where
        O: Bounded<Handle = H>,
    {
        self.intersects_rect(object.bounds(), Some(object.handle()))
    }

    /// Visitor form of [`intersects_rect`](Self::intersects_rect); each
    /// match is visited once and nothing is allocated.
    pub fn for_each_intersecting<F>(&self, rect: Rect, exclude: Option<H>, f: F)
    where
        F: FnMut(H),
    {
        self.visit_intersecting(&rect, exclude, f);
    }

    /// Coordinates the object occupies, or `None` when it is not indexed.
    /// The returned set is reused by the next call.
    pub fn object_cells(&mut self, handle: H) -> Option<&HashSet<CellCoord>> {
        let object = self.objects.get(&handle)?;
        self.cell_results.clear();
        self.cell_results.extend(object.cells.iter().copied());
        Some(&self.cell_results)
    }

    /// Counters gathered since construction or the last reset.
    pub fn metrics_snapshot(&self) -> SpatialMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Coarse pass over the cells of `rect`, exact pass over candidates.
    /// Returns how many candidates were examined.
    ///
    /// An object spanning several cells of the range is reported only from
    /// the first of its own cells that lies in the range, which makes the
    /// walk duplicate-free without a scratch set.
    fn visit_intersecting<F>(&self, rect: &Rect, exclude: Option<H>, mut f: F) -> u64
    where
        F: FnMut(H),
    {
        let range = self.cell_range(rect);
        let mut candidates = 0;
        let mut visit_cell = |coord: CellCoord, cell: &HashCell<H>| {
            for &member in &cell.members {
                if Some(member) == exclude {
                    continue;
                }
                let Some(object) = self.objects.get(&member) else {
                    continue;
                };
                if object.cells.iter().find(|c| range.contains(**c)) != Some(&coord) {
                    continue;
                }
                candidates += 1;
                if object.bounds.intersects(rect) {
                    f(member);
                }
            }
        };

        // Huge query ranges walk the existing cells instead of every coordinate.
        if range.len() > self.cells.len() as u64 {
            for (&coord, cell) in &self.cells {
                if range.contains(coord) {
                    visit_cell(coord, cell);
                }
            }
        } else {
            for coord in range.iter() {
                if let Some(cell) = self.cells.get(&coord) {
                    visit_cell(coord, cell);
                }
            }
        }
        candidates
    }
}

/// Bounds of `object`, or [`SpatialError::NonFinite`] when they have no cell range.
fn checked_bounds<O: Bounded>(object: &O) -> Result<Rect, SpatialError> {
    let bounds = object.bounds();
    if !bounds.is_finite() {
        tracing::debug!(?bounds, "non-finite bounds rejected");
        return Err(SpatialError::NonFinite);
    }
    Ok(bounds)
}

/// Remove `handle` from each listed cell.
fn detach<H: Copy + Eq + Hash>(
    cells: &mut HashMap<CellCoord, HashCell<H>>,
    handle: H,
    coords: &[CellCoord],
) {
    for coord in coords {
        if let Some(cell) = cells.get_mut(coord) {
            if let Some(slot) = cell.members.iter().position(|&member| member == handle) {
                cell.members.swap_remove(slot);
            }
        }
    }
}
