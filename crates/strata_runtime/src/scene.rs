//! Headless broad-phase scene: moving boxes indexed by both grids.
//!
//! The scene owns the objects; the grids only hold their handles. Each step
//! integrates motion, updates both grids, then queries them.

use anyhow::{Context, Result};
use strata_core::handle::ObjectHandle;
use strata_core::math::{DeterministicRng, Rect, Vec2};
use strata_core::spatial::{
    Bounded, BoundedGrid, CellCoord, GridOccupant, MissingCells, SparseHashGrid,
};
use strata_core::time::SimulationTime;
use strata_services::{Settings, SimulationSettings, WORLD_MARGIN as EDGE};

/// Caller-owned game object.
pub struct Mover {
    handle: ObjectHandle,
    center: Vec2,
    size: Vec2,
    velocity: Vec2,
    cell: Option<CellCoord>,
}

impl Mover {
    fn spawn(
        handle: ObjectHandle,
        sim: &SimulationSettings,
        world: Vec2,
        rng: &mut DeterministicRng,
    ) -> Self {
        let size = Vec2::new(
            rng.range_f32(sim.min_object_size, sim.max_object_size),
            rng.range_f32(sim.min_object_size, sim.max_object_size),
        );
        let half = size * 0.5;
        let center = Vec2::new(
            rng.range_f32(half.x, world.x - half.x - EDGE),
            rng.range_f32(half.y, world.y - half.y - EDGE),
        );
        let velocity = Vec2::new(
            rng.range_f32(-sim.max_speed, sim.max_speed),
            rng.range_f32(-sim.max_speed, sim.max_speed),
        );
        Self {
            handle,
            center,
            size,
            velocity,
            cell: None,
        }
    }

    /// Current position, the point the bounded grid indexes.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Advance by `dt` seconds, bouncing off the world edges.
    fn integrate(&mut self, dt: f32, world: Vec2) {
        self.center += self.velocity * dt;
        let half = self.size * 0.5;
        let lo = half;
        let hi = world - half - Vec2::splat(EDGE);
        if self.center.x < lo.x || self.center.x > hi.x {
            self.velocity.x = -self.velocity.x;
        }
        if self.center.y < lo.y || self.center.y > hi.y {
            self.velocity.y = -self.velocity.y;
        }
        self.center = self.center.clamp(lo, hi);
    }
}

impl GridOccupant for Mover {
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

impl Bounded for Mover {
    type Handle = ObjectHandle;

    fn handle(&self) -> ObjectHandle {
        self.handle
    }

    fn bounds(&self) -> Rect {
        Rect::from_center(self.center, self.size)
    }
}

/// What one step observed.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepStats {
    /// Movers whose bounded-grid cell changed.
    pub cell_changes: u32,
    /// Distinct overlapping pairs reported by the hash grid.
    pub overlapping_pairs: u32,
    /// Sum over movers of the bounded-grid probe result sizes.
    pub neighbours: u32,
    pub respawned: Option<ObjectHandle>,
}

pub struct Scene {
    sim: SimulationSettings,
    world: Vec2,
    movers: Vec<Mover>,
    bounded: BoundedGrid<ObjectHandle>,
    hash: SparseHashGrid<ObjectHandle>,
    rng: DeterministicRng,
    time: SimulationTime,
}

impl Scene {
    pub fn new(settings: &Settings) -> Result<Self> {
        let sim = settings.simulation.clone();
        let world = settings.bounded.world_size();
        let mut scene = Self {
            bounded: BoundedGrid::new(settings.bounded).context("creating bounded grid")?,
            hash: SparseHashGrid::new(settings.hash.cell_size()).context("creating hash grid")?,
            movers: Vec::with_capacity(sim.object_count as usize),
            rng: DeterministicRng::new(sim.seed),
            time: SimulationTime::new(sim.tick_rate_hz),
            world,
            sim,
        };

        for index in 0..scene.sim.object_count {
            let handle = ObjectHandle::new(index, 0);
            let mut mover = Mover::spawn(handle, &scene.sim, world, &mut scene.rng);
            scene.index(&mut mover)?;
            scene.movers.push(mover);
        }
        Ok(scene)
    }

    fn index(&mut self, mover: &mut Mover) -> Result<()> {
        let center = mover.center;
        self.bounded
            .insert(mover, center)
            .context("inserting into bounded grid")?;
        self.hash.add_object(&*mover).context("adding to hash grid")?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.movers.len()
    }

    pub fn tick(&self) -> u64 {
        self.time.tick_count()
    }

    pub fn movers(&self) -> &[Mover] {
        &self.movers
    }

    pub fn bounded(&self) -> &BoundedGrid<ObjectHandle> {
        &self.bounded
    }

    pub fn hash(&self) -> &SparseHashGrid<ObjectHandle> {
        &self.hash
    }

    pub fn step(&mut self) -> Result<StepStats> {
        let mut stats = StepStats::default();
        let dt = self.time.delta_seconds();

        for mover in &mut self.movers {
            mover.integrate(dt, self.world);
            let center = mover.center;
            if self.bounded.update_membership(mover, center)? {
                stats.cell_changes += 1;
            }
            self.hash.update_object_cells(&*mover, MissingCells::Create)?;
        }

        // Once per simulated second, despawn one mover and reuse its slot.
        let tick_rate = u64::from(self.sim.tick_rate_hz.max(1));
        if !self.movers.is_empty() && (self.time.tick_count() + 1) % tick_rate == 0 {
            stats.respawned = Some(self.respawn()?);
        }

        for mover in &self.movers {
            stats.overlapping_pairs += self.hash.intersects_object(mover).len() as u32;
            let probe = probe_rect(mover.center, self.sim.query_size, self.world);
            stats.neighbours += self.bounded.query_rect(probe)?.len() as u32;
        }
        stats.overlapping_pairs /= 2;

        self.time.advance_tick();
        Ok(stats)
    }

    fn respawn(&mut self) -> Result<ObjectHandle> {
        let slot = self.rng.next_u32() as usize % self.movers.len();
        let old = &mut self.movers[slot];
        self.bounded.remove(old).context("removing from bounded grid")?;
        self.hash.remove_object(old.handle);

        let handle = old.handle.next_generation();
        let mut mover = Mover::spawn(handle, &self.sim, self.world, &mut self.rng);
        self.index(&mut mover)?;
        tracing::debug!(handle = handle.to_bits(), "mover respawned");
        self.movers[slot] = mover;
        Ok(handle)
    }
}

/// Square probe around `center`, shifted to stay inside the world.
fn probe_rect(center: Vec2, size: f32, world: Vec2) -> Rect {
    let rect = Rect::from_center(center, Vec2::splat(size));
    let max = world - Vec2::splat(size + EDGE);
    Rect::new(rect.x.min(max.x).max(0.0), rect.y.min(max.y).max(0.0), size, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::spatial::GridDimensions;

    fn small_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bounded = GridDimensions::new(16, 16, 16.0, 16.0);
        settings.hash.cell_width = 32.0;
        settings.hash.cell_height = 24.0;
        settings.simulation.object_count = 40;
        settings.simulation.tick_rate_hz = 30;
        settings.simulation.max_object_size = 20.0;
        settings.simulation.query_size = 40.0;
        settings.validate().unwrap();
        settings
    }

    #[test]
    fn test_grids_track_movers() {
        let mut scene = Scene::new(&small_settings()).unwrap();
        let mut respawns = 0;
        let mut last = StepStats::default();
        for _ in 0..90 {
            last = scene.step().unwrap();
            respawns += last.respawned.is_some() as u32;
        }
        assert_eq!(scene.tick(), 90);
        assert_eq!(respawns, 3);
        assert_eq!(scene.bounded().len(), 40);
        assert_eq!(scene.hash().len(), 40);

        for mover in scene.movers() {
            assert_eq!(mover.grid_cell(), Some(scene.bounded().cell_coord_of(mover.center())));
            assert_eq!(scene.hash().indexed_bounds(mover.handle), Some(mover.bounds()));
        }

        // Pairs found by the hash grid match an all-pairs scan.
        let movers = scene.movers();
        let mut expected = 0;
        for (i, a) in movers.iter().enumerate() {
            for b in &movers[i + 1..] {
                if a.bounds().intersects(&b.bounds()) {
                    expected += 1;
                }
            }
        }
        assert_eq!(last.overlapping_pairs, expected);
    }

    #[test]
    fn test_respawn_retires_old_handle() {
        let mut scene = Scene::new(&small_settings()).unwrap();
        let mut retired = None;
        while retired.is_none() {
            retired = scene.step().unwrap().respawned;
        }
        let new = retired.unwrap();
        assert_eq!(new.generation(), 1);
        assert!(scene.hash().contains(new));
        assert!(!scene.hash().contains(ObjectHandle::new(new.index(), 0)));
    }

    #[test]
    fn test_objects_at_size_limit_step_inside_world() {
        let mut settings = small_settings();
        let world = settings.bounded.world_size().x;
        settings.simulation.object_count = 3;
        settings.simulation.min_object_size = world - EDGE * 3.0;
        settings.simulation.max_object_size = world - EDGE * 2.0;
        settings.validate().unwrap();

        let mut scene = Scene::new(&settings).unwrap();
        for _ in 0..45 {
            scene.step().unwrap();
        }
        for mover in scene.movers() {
            assert!(scene.bounded().contains_position(mover.center()));
            let bounds = mover.bounds();
            assert!(bounds.x >= 0.0 && bounds.bottom_right().x < world);
        }
    }

    #[test]
    fn test_probe_stays_inside_world() {
        let world = Vec2::splat(256.0);
        for center in [Vec2::ZERO, Vec2::splat(255.9), Vec2::new(3.0, 250.0)] {
            let probe = probe_rect(center, 40.0, world);
            assert!(probe.x >= 0.0 && probe.y >= 0.0);
            assert!(probe.bottom_right().x < world.x && probe.bottom_right().y < world.y);
        }
    }
}
