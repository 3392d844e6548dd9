//! Fixed-extent uniform grid with O(1) cell lookup.
//!
//! Every cell is allocated at construction and tagged with its coordinate.
//! An object lives in exactly one cell, the one containing its position, and
//! its `GridOccupant::grid_cell` slot mirrors that cell.

use super::metrics::SpatialMetrics;
use super::{CellCoord, GridOccupant, SpatialError, SpatialMetricsSnapshot};
use crate::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Grid extent in cells and cell size in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub grid_width: u32,
    pub grid_height: u32,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl GridDimensions {
    pub const fn new(grid_width: u32, grid_height: u32, cell_width: f32, cell_height: f32) -> Self {
        Self {
            grid_width,
            grid_height,
            cell_width,
            cell_height,
        }
    }

    /// Check that the dimensions describe a non-empty grid whose cells are
    /// addressable by [`CellCoord`].
    pub fn validate(&self) -> Result<(), SpatialError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(SpatialError::InvalidDimensions {
                reason: "grid width and height must be at least one cell",
            });
        }
        if i32::try_from(self.grid_width).is_err() || i32::try_from(self.grid_height).is_err() {
            return Err(SpatialError::InvalidDimensions {
                reason: "grid width and height must not exceed i32::MAX cells",
            });
        }
        if !(self.cell_width > 0.0 && self.cell_width.is_finite())
            || !(self.cell_height > 0.0 && self.cell_height.is_finite())
        {
            return Err(SpatialError::InvalidDimensions {
                reason: "cell width and height must be positive and finite",
            });
        }
        if (self.grid_width as usize).checked_mul(self.grid_height as usize).is_none() {
            return Err(SpatialError::InvalidDimensions {
                reason: "cell count overflows usize",
            });
        }
        Ok(())
    }

    /// Cell extent in world units.
    #[inline]
    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(self.cell_width, self.cell_height)
    }

    /// World extent covered by the grid, starting at the origin.
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.grid_width as f32 * self.cell_width,
            self.grid_height as f32 * self.cell_height,
        )
    }
}

/// One cell of a [`BoundedGrid`].
#[derive(Debug, Clone)]
pub struct GridCell<H> {
    coord: CellCoord,
    members: Vec<H>,
}

impl<H: Copy + Eq> GridCell<H> {
    fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            members: Vec::new(),
        }
    }

    /// Coordinate this cell was tagged with at construction.
    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Members in insertion order, perturbed by swap-removal.
    pub fn members(&self) -> &[H] {
        &self.members
    }

    /// Number of objects in this cell.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the cell holds no objects.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn position_of(&self, handle: H) -> Option<usize> {
        self.members.iter().position(|&member| member == handle)
    }
}

/// Point-sampling spatial index over a fixed, finite world.
///
/// Objects are added with [`insert`](Self::insert) before any update; an
/// object whose cell slot is empty is rejected by update and remove with
/// [`SpatialError::NotIndexed`].
pub struct BoundedGrid<H> {
    dims: GridDimensions,
    cells: Vec<GridCell<H>>,
    len: usize,
    query_results: HashSet<H>,
    metrics: SpatialMetrics,
}

impl<H: Copy + Eq + Hash> BoundedGrid<H> {
    /// Allocate `grid_width * grid_height` cells up front.
    pub fn new(dims: GridDimensions) -> Result<Self, SpatialError> {
        dims.validate()?;
        // `validate` keeps both extents within i32, so the casts are lossless.
        let cells = (0..dims.grid_height)
            .flat_map(|y| (0..dims.grid_width).map(move |x| CellCoord::new(x as i32, y as i32)))
            .map(GridCell::new)
            .collect();
        tracing::debug!(
            width = dims.grid_width,
            height = dims.grid_height,
            "bounded grid allocated"
        );
        Ok(Self {
            dims,
            cells,
            len: 0,
            query_results: HashSet::new(),
            metrics: SpatialMetrics::default(),
        })
    }

    /// Dimensions the grid was built with.
    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no object is indexed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All cells, row-major (`x + grid_width * y`).
    pub fn cells(&self) -> &[GridCell<H>] {
        &self.cells
    }

    /// Cell containing `position`. Pure; the result may lie outside the grid.
    #[inline]
    pub fn cell_coord_of(&self, position: Vec2) -> CellCoord {
        CellCoord::from_position(position, self.dims.cell_size())
    }

    /// Check if `position` falls inside the grid.
    pub fn contains_position(&self, position: Vec2) -> bool {
        self.index_of_position(position).is_ok()
    }

    /// Cell at `coord`, or [`SpatialError::OutOfBounds`] outside the grid.
    pub fn cell_at(&self, coord: CellCoord) -> Result<&GridCell<H>, SpatialError> {
        let index = self.index_of(coord)?;
        Ok(&self.cells[index])
    }

    #[inline]
    fn index_of(&self, coord: CellCoord) -> Result<usize, SpatialError> {
        let in_range = coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.dims.grid_width
            && (coord.y as u32) < self.dims.grid_height;
        if !in_range {
            tracing::debug!(%coord, "cell outside bounded grid");
            return Err(SpatialError::OutOfBounds {
                coord,
                width: self.dims.grid_width,
                height: self.dims.grid_height,
            });
        }
        Ok(coord.x as usize + self.dims.grid_width as usize * coord.y as usize)
    }

    /// Cell coordinate and index of `position`, rejecting NaN and infinity
    /// before floor division can turn them into a real cell.
    fn index_of_position(&self, position: Vec2) -> Result<(CellCoord, usize), SpatialError> {
        if !position.is_finite() {
            tracing::debug!(?position, "non-finite position rejected");
            return Err(SpatialError::NonFinite);
        }
        let coord = self.cell_coord_of(position);
        Ok((coord, self.index_of(coord)?))
    }

    /// Add an object at `position` and record its cell on the object.
    pub fn insert<O>(&mut self, object: &mut O, position: Vec2) -> Result<CellCoord, SpatialError>
    where
        O: GridOccupant<Handle = H>,
    {
        if object.grid_cell().is_some() {
            return Err(SpatialError::AlreadyIndexed);
        }
        let (coord, index) = self.index_of_position(position)?;
        self.cells[index].members.push(object.handle());
        object.set_grid_cell(Some(coord));
        self.len += 1;
        Ok(coord)
    }

    /// Move an object to the cell of `position`.
    ///
    /// Returns `true` when the object changed cell and `false` when it stayed
    /// put, in which case no cell is touched. On error nothing changes.
    pub fn update_membership<O>(
        &mut self,
        object: &mut O,
        position: Vec2,
    ) -> Result<bool, SpatialError>
    where
        O: GridOccupant<Handle = H>,
    {
        let current = object.grid_cell().ok_or(SpatialError::NotIndexed)?;
        let (target, target_index) = self.index_of_position(position)?;
        if target == current {
            return Ok(false);
        }

        let handle = object.handle();
        let current_index = self.index_of(current)?;
        let slot = self.cells[current_index]
            .position_of(handle)
            .ok_or(SpatialError::NotIndexed)?;
        self.cells[current_index].members.swap_remove(slot);
        self.cells[target_index].members.push(handle);
        object.set_grid_cell(Some(target));
        self.metrics.record_move();
        Ok(true)
    }

    /// Remove an object and clear its cell slot.
    pub fn remove<O>(&mut self, object: &mut O) -> Result<(), SpatialError>
    where
        O: GridOccupant<Handle = H>,
    {
        let current = object.grid_cell().ok_or(SpatialError::NotIndexed)?;
        let index = self.index_of(current)?;
        let slot = self.cells[index]
            .position_of(object.handle())
            .ok_or(SpatialError::NotIndexed)?;
        self.cells[index].members.swap_remove(slot);
        object.set_grid_cell(None);
        self.len -= 1;
        Ok(())
    }

    /// Distinct cell indices under the four corners of `rect`.
    fn corner_cells(&self, rect: &Rect) -> Result<([usize; 4], usize), SpatialError> {
        let corners = [
            rect.top_left(),
            rect.top_right(),
            rect.bottom_left(),
            rect.bottom_right(),
        ];
        let mut indices = [0usize; 4];
        let mut count = 0;
        for corner in corners {
            let (_, index) = self.index_of_position(corner)?;
            if !indices[..count].contains(&index) {
                indices[count] = index;
                count += 1;
            }
        }
        Ok((indices, count))
    }

    /// Members of the (up to four) cells under the corners of `rect`.
    ///
    /// Only corner cells are sampled: a rectangle wider or taller than two
    /// cells does not see the cells between its corners. The returned set is
    /// reused by the next query.
    pub fn query_rect(&mut self, rect: Rect) -> Result<&HashSet<H>, SpatialError> {
        let (indices, count) = self.corner_cells(&rect)?;
        self.query_results.clear();
        let mut candidates = 0;
        for &index in &indices[..count] {
            let members = &self.cells[index].members;
            candidates += members.len() as u64;
            self.query_results.extend(members.iter().copied());
        }
        self.metrics.record_query(candidates);
        Ok(&self.query_results)
    }

    /// Visitor form of [`query_rect`](Self::query_rect). Objects live in a
    /// single cell, so each is visited at most once.
    pub fn for_each_in_rect<F>(&self, rect: Rect, mut f: F) -> Result<(), SpatialError>
    where
        F: FnMut(H),
    {
        let (indices, count) = self.corner_cells(&rect)?;
        for &index in &indices[..count] {
            self.cells[index].members.iter().copied().for_each(&mut f);
        }
        Ok(())
    }

    /// Counters gathered since construction or the last reset.
    pub fn metrics_snapshot(&self) -> SpatialMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ObjectHandle;

    struct Actor {
        handle: ObjectHandle,
        cell: Option<CellCoord>,
    }

    impl Actor {
        fn new(index: u32) -> Self {
            Self {
                handle: ObjectHandle::new(index, 0),
                cell: None,
            }
        }
    }

    impl GridOccupant for Actor {
        type Handle = ObjectHandle;

        fn handle(&self) -> ObjectHandle {
            self.handle
        }

        fn grid_cell(&self) -> Option<CellCoord> {
            self.cell
        }

        fn set_grid_cell(&mut self, cell: Option<CellCoord>) {
            self.cell = cell;
        }
    }

    fn grid() -> BoundedGrid<ObjectHandle> {
        BoundedGrid::new(GridDimensions::new(10, 10, 16.0, 16.0)).unwrap()
    }

    /// Cells listing `handle`.
    fn cells_holding(grid: &BoundedGrid<ObjectHandle>, handle: ObjectHandle) -> Vec<CellCoord> {
        grid.cells()
            .iter()
            .filter(|cell| cell.members().contains(&handle))
            .map(|cell| cell.coord())
            .collect()
    }

    #[test]
    fn test_rejects_invalid_dimensions() {
        for dims in [
            GridDimensions::new(0, 10, 16.0, 16.0),
            GridDimensions::new(10, 0, 16.0, 16.0),
            GridDimensions::new(10, 10, 0.0, 16.0),
            GridDimensions::new(10, 10, 16.0, -1.0),
            GridDimensions::new(10, 10, f32::NAN, 16.0),
            GridDimensions::new(1 << 31, 1, 1.0, 1.0),
            GridDimensions::new(1, u32::MAX, 1.0, 1.0),
        ] {
            assert!(matches!(
                BoundedGrid::<ObjectHandle>::new(dims),
                Err(SpatialError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn test_cells_are_tagged_row_major() {
        let grid = BoundedGrid::<ObjectHandle>::new(GridDimensions::new(3, 2, 8.0, 8.0)).unwrap();
        assert_eq!(grid.cells().len(), 6);
        assert_eq!(grid.cells()[4].coord(), CellCoord::new(1, 1));
        assert_eq!(grid.cell_at(CellCoord::new(2, 1)).unwrap().coord(), CellCoord::new(2, 1));
        assert!(grid.cell_at(CellCoord::new(3, 0)).is_err());
    }

    #[test]
    fn test_cell_coord_of() {
        let dims = GridDimensions::new(10, 10, 16.0, 8.0);
        let grid = BoundedGrid::<ObjectHandle>::new(dims).unwrap();
        assert_eq!(grid.cell_coord_of(Vec2::new(5.0, 5.0)), CellCoord::new(0, 0));
        assert_eq!(grid.cell_coord_of(Vec2::new(33.0, 17.0)), CellCoord::new(2, 2));
        assert!(!grid.contains_position(Vec2::new(160.0, 0.0)));
        assert!(!grid.contains_position(Vec2::new(-0.1, 0.0)));
    }

    #[test]
    fn test_move_across_cell_boundary() {
        let mut grid = grid();
        let mut actor = Actor::new(1);

        assert_eq!(grid.insert(&mut actor, Vec2::new(5.0, 5.0)), Ok(CellCoord::new(0, 0)));
        assert_eq!(actor.cell, Some(CellCoord::new(0, 0)));

        assert_eq!(grid.update_membership(&mut actor, Vec2::new(17.0, 5.0)), Ok(true));
        assert!(grid.cell_at(CellCoord::new(0, 0)).unwrap().is_empty());
        assert_eq!(grid.cell_at(CellCoord::new(1, 0)).unwrap().members(), &[actor.handle]);
        assert_eq!(actor.cell, Some(CellCoord::new(1, 0)));
    }

    #[test]
    fn test_move_within_cell_reports_no_change() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        grid.insert(&mut actor, Vec2::new(5.0, 5.0)).unwrap();

        assert_eq!(grid.update_membership(&mut actor, Vec2::new(15.0, 1.0)), Ok(false));
        assert_eq!(cells_holding(&grid, actor.handle), vec![CellCoord::new(0, 0)]);
    }

    #[test]
    fn test_single_cell_membership_after_random_walk() {
        let mut grid = grid();
        let mut rng = crate::math::DeterministicRng::new(11);
        let mut actors: Vec<Actor> = (0..20).map(Actor::new).collect();
        for actor in &mut actors {
            let position = Vec2::new(rng.range_f32(0.0, 159.0), rng.range_f32(0.0, 159.0));
            grid.insert(actor, position).unwrap();
        }

        for _ in 0..50 {
            for actor in &mut actors {
                let position = Vec2::new(rng.range_f32(0.0, 159.0), rng.range_f32(0.0, 159.0));
                grid.update_membership(actor, position).unwrap();
                let expected = grid.cell_coord_of(position);
                assert_eq!(cells_holding(&grid, actor.handle), vec![expected]);
                assert_eq!(actor.cell, Some(expected));
            }
        }
        assert_eq!(grid.len(), 20);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        grid.insert(&mut actor, Vec2::new(5.0, 5.0)).unwrap();

        assert_eq!(
            grid.insert(&mut actor, Vec2::new(40.0, 40.0)),
            Err(SpatialError::AlreadyIndexed)
        );
        assert_eq!(cells_holding(&grid, actor.handle), vec![CellCoord::new(0, 0)]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_update_requires_insert() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        assert_eq!(
            grid.update_membership(&mut actor, Vec2::new(5.0, 5.0)),
            Err(SpatialError::NotIndexed)
        );
        assert_eq!(grid.remove(&mut actor), Err(SpatialError::NotIndexed));
        assert!(cells_holding(&grid, actor.handle).is_empty());
    }

    #[test]
    fn test_out_of_range_fails_without_moving() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        assert!(matches!(
            grid.insert(&mut actor, Vec2::new(-1.0, 5.0)),
            Err(SpatialError::OutOfBounds { .. })
        ));
        assert_eq!(actor.cell, None);

        grid.insert(&mut actor, Vec2::new(5.0, 5.0)).unwrap();
        let err = grid.update_membership(&mut actor, Vec2::new(170.0, 5.0)).unwrap_err();
        assert_eq!(
            err,
            SpatialError::OutOfBounds {
                coord: CellCoord::new(10, 0),
                width: 10,
                height: 10,
            }
        );
        assert_eq!(actor.cell, Some(CellCoord::new(0, 0)));
        assert_eq!(cells_holding(&grid, actor.handle), vec![CellCoord::new(0, 0)]);
    }

    #[test]
    fn test_non_finite_positions_are_rejected() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        for position in [
            Vec2::new(f32::NAN, f32::NAN),
            Vec2::new(5.0, f32::NAN),
            Vec2::new(f32::INFINITY, 5.0),
        ] {
            assert_eq!(grid.insert(&mut actor, position), Err(SpatialError::NonFinite));
            assert!(!grid.contains_position(position));
        }
        assert_eq!(actor.cell, None);
        assert!(grid.is_empty());

        grid.insert(&mut actor, Vec2::new(5.0, 5.0)).unwrap();
        assert_eq!(
            grid.update_membership(&mut actor, Vec2::new(f32::NAN, 5.0)),
            Err(SpatialError::NonFinite)
        );
        assert_eq!(actor.cell, Some(CellCoord::new(0, 0)));
        assert_eq!(cells_holding(&grid, actor.handle), vec![CellCoord::new(0, 0)]);

        assert_eq!(
            grid.query_rect(Rect::new(f32::NAN, 0.0, 1.0, 1.0)),
            Err(SpatialError::NonFinite)
        );
        assert_eq!(
            grid.for_each_in_rect(Rect::new(0.0, 0.0, f32::INFINITY, 1.0), |_| {}),
            Err(SpatialError::NonFinite)
        );
    }

    #[test]
    fn test_oversized_grid_is_rejected_before_allocation() {
        let dims = GridDimensions::new(1 << 31, 1, 1.0, 1.0);
        assert!(matches!(dims.validate(), Err(SpatialError::InvalidDimensions { .. })));
        assert!(GridDimensions::new(i32::MAX as u32, 1, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_remove_clears_cell_and_slot() {
        let mut grid = grid();
        let mut a = Actor::new(1);
        let mut b = Actor::new(2);
        grid.insert(&mut a, Vec2::new(5.0, 5.0)).unwrap();
        grid.insert(&mut b, Vec2::new(6.0, 6.0)).unwrap();

        grid.remove(&mut a).unwrap();
        assert_eq!(a.cell, None);
        assert_eq!(grid.cell_at(CellCoord::new(0, 0)).unwrap().members(), &[b.handle]);
        assert_eq!(grid.len(), 1);

        // Re-adding after removal is allowed.
        grid.insert(&mut a, Vec2::new(20.0, 20.0)).unwrap();
        assert_eq!(cells_holding(&grid, a.handle), vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn test_query_dedups_corner_cells() {
        let mut grid = grid();
        let mut a = Actor::new(1);
        let mut b = Actor::new(2);
        let mut c = Actor::new(3);
        grid.insert(&mut a, Vec2::new(5.0, 5.0)).unwrap();
        grid.insert(&mut b, Vec2::new(20.0, 20.0)).unwrap();
        grid.insert(&mut c, Vec2::new(100.0, 100.0)).unwrap();

        // Spans cells (0,0)..(1,1); all four corners are distinct cells.
        let found = grid.query_rect(Rect::new(8.0, 8.0, 16.0, 16.0)).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a.handle) && found.contains(&b.handle));

        // Zero-area rectangle samples one cell.
        let found = grid.query_rect(Rect::new(100.0, 100.0, 0.0, 0.0)).unwrap();
        assert_eq!(found.iter().copied().collect::<Vec<_>>(), vec![c.handle]);
    }

    #[test]
    fn test_query_reuses_result_set() {
        let mut grid = grid();
        let mut a = Actor::new(1);
        grid.insert(&mut a, Vec2::new(5.0, 5.0)).unwrap();

        assert_eq!(grid.query_rect(Rect::new(0.0, 0.0, 4.0, 4.0)).unwrap().len(), 1);
        assert!(grid.query_rect(Rect::new(64.0, 64.0, 4.0, 4.0)).unwrap().is_empty());
    }

    #[test]
    fn test_query_out_of_range_corner_fails() {
        let mut grid = grid();
        assert!(matches!(
            grid.query_rect(Rect::new(150.0, 150.0, 20.0, 5.0)),
            Err(SpatialError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_for_each_in_rect_matches_query() {
        let mut grid = grid();
        let mut actors: Vec<Actor> = (0..6).map(Actor::new).collect();
        for (i, actor) in actors.iter_mut().enumerate() {
            grid.insert(actor, Vec2::new(4.0 + i as f32 * 6.0, 4.0)).unwrap();
        }
        let rect = Rect::new(0.0, 0.0, 20.0, 4.0);

        let mut visited = Vec::new();
        grid.for_each_in_rect(rect, |handle| visited.push(handle)).unwrap();
        let queried = grid.query_rect(rect).unwrap();
        assert_eq!(visited.len(), queried.len());
        assert!(visited.iter().all(|handle| queried.contains(handle)));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_metrics_count_moves_and_queries() {
        let mut grid = grid();
        let mut actor = Actor::new(1);
        grid.insert(&mut actor, Vec2::new(5.0, 5.0)).unwrap();
        grid.update_membership(&mut actor, Vec2::new(6.0, 5.0)).unwrap();
        grid.update_membership(&mut actor, Vec2::new(40.0, 5.0)).unwrap();
        grid.query_rect(Rect::new(40.0, 0.0, 1.0, 1.0)).unwrap();

        let snapshot = grid.metrics_snapshot();
        assert_eq!(snapshot.moves, 1);
        assert_eq!(snapshot.queries, 1);
        assert_eq!(snapshot.candidates, 1);

        grid.reset_metrics();
        assert_eq!(grid.metrics_snapshot(), SpatialMetricsSnapshot::default());
    }
}
