//! Strata Engine Core
//!
//! Contains the fundamental simulation building blocks:
//! - Spatial indexing for broad-phase queries (bounded grid, sparse hash grid)
//! - Object handles shared with the caller's world state
//! - Deterministic time and math

pub mod handle;
pub mod math;
pub mod spatial;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
