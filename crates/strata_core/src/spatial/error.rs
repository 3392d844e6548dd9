use crate::spatial::CellCoord;
use thiserror::Error;

/// Errors reported by the spatial index.
///
/// Queries never fail for lack of matches; they return an empty set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialError {
    #[error("invalid grid dimensions: {reason}")]
    InvalidDimensions { reason: &'static str },

    /// Bounded grid only. Positions are rejected, never clamped or wrapped.
    #[error("cell {coord} is outside the {width}x{height} grid")]
    OutOfBounds {
        coord: CellCoord,
        width: u32,
        height: u32,
    },

    /// NaN or infinite coordinates, which have no cell.
    #[error("position or bounds are not finite")]
    NonFinite,

    #[error("object is not indexed")]
    NotIndexed,

    #[error("object is already indexed")]
    AlreadyIndexed,
}
