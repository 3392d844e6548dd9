//! Strata Engine Runtime
//!
//! Headless binary that drives the spatial index through a deterministic
//! scene. Usage: `strata [SETTINGS_JSON]`.

mod scene;

use anyhow::{Context, Result};
use scene::Scene;
use std::path::PathBuf;
use strata_metrics::StepTimer;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize logging (RUST_LOG overrides the default level)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Strata Engine v{}", strata_core::VERSION);
    tracing::info!("Initializing services...");
    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = strata_services::init_services(settings_path.as_deref())
        .context("failed to initialize services")?;

    let mut scene = Scene::new(&settings).context("failed to build scene")?;
    tracing::info!(
        objects = scene.len(),
        grid_width = settings.bounded.grid_width,
        grid_height = settings.bounded.grid_height,
        "scene spawned"
    );

    let sim = &settings.simulation;
    let mut timer = StepTimer::new(sim.tick_rate_hz as usize);
    let mut total_pairs = 0u64;
    let mut total_cell_changes = 0u64;
    let mut respawns = 0u32;

    for _ in 0..sim.steps {
        timer.begin();
        let stats = scene
            .step()
            .with_context(|| format!("step {} failed", scene.tick()))?;
        timer.end();

        total_pairs += u64::from(stats.overlapping_pairs);
        total_cell_changes += u64::from(stats.cell_changes);
        respawns += stats.respawned.is_some() as u32;

        let tick = scene.tick();
        if sim.log_every > 0 && tick % u64::from(sim.log_every) == 0 {
            tracing::info!(
                tick,
                pairs = stats.overlapping_pairs,
                neighbours = stats.neighbours,
                cell_changes = stats.cell_changes,
                step_ms = timer.step_time_ms(),
                "step"
            );
        }
    }

    tracing::info!(
        steps = sim.steps,
        total_pairs,
        total_cell_changes,
        respawns,
        hash_cells = scene.hash().cell_count(),
        "simulation finished"
    );

    strata_metrics::metrics! {
        let (min_ms, max_ms) = timer.step_time_range_ms();
        tracing::info!(min_ms, max_ms, "step time range");
        tracing::info!(metrics = ?scene.bounded().metrics_snapshot(), "bounded grid");
        tracing::info!(metrics = ?scene.hash().metrics_snapshot(), "sparse hash grid");
    }

    Ok(())
}
