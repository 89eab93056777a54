use bullseye_core::ImageDataError;

use crate::detector::MAX_WINDOW_RADIUS;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BullseyeError {
    #[error("Invalid radii: min_radius {min_radius}, max_radius {max_radius} (need 0 < min_radius < max_radius <= {})", MAX_WINDOW_RADIUS)]
    InvalidRadii { min_radius: usize, max_radius: usize },

    #[error("Invalid ring count: {0} (must be >= 1)")]
    InvalidRingCount(usize),

    #[error("Invalid scoring parameters: min_score {min_score}, symmetry_weight {symmetry_weight}")]
    InvalidScoring { min_score: f64, symmetry_weight: f64 },

    #[error("Invalid exclusion radius: {0} (must be in 1..={})", MAX_WINDOW_RADIUS)]
    InvalidExclusionRadius(usize),

    #[error("Annulus {index} spanning radii [{inner:.3}, {outer:.3}) covers no pixel offsets")]
    EmptyAnnulus { index: usize, inner: f64, outer: f64 },

    #[error("Image {rows}x{columns} too small (minimum {min_size}x{min_size})")]
    ImageTooSmall { rows: usize, columns: usize, min_size: usize },

    #[error(transparent)]
    ImageData(#[from] ImageDataError),

    #[error("No image bound (call set_image first)")]
    NotReady,
}

pub type BullseyeResult<T> = Result<T, BullseyeError>;
