//! Core types shared by the bullseye keypoint selector crates.
//!
//! Coordinates follow the raster convention used throughout the workspace:
//! `row` grows downward, `column` grows rightward, origin at the top-left pixel.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raised when a pixel buffer does not match the dimensions it is viewed with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageDataError {
    #[error("image data length mismatch: expected {expected_len}, got {actual_len}")]
    LengthMismatch { expected_len: usize, actual_len: usize },
    #[error("image dimensions {rows}x{columns} overflow the addressable size")]
    DimensionsOverflow { rows: usize, columns: usize },
}

/// Borrowed, read-only view of a row-major 8-bit grayscale image.
#[derive(Debug, Clone, Copy)]
pub struct GrayView<'a> {
    data: &'a [u8],
    rows: usize,
    columns: usize,
}

impl<'a> GrayView<'a> {
    pub fn new(data: &'a [u8], rows: usize, columns: usize) -> Result<Self, ImageDataError> {
        let expected_len = rows
            .checked_mul(columns)
            .ok_or(ImageDataError::DimensionsOverflow { rows, columns })?;
        if data.len() != expected_len {
            return Err(ImageDataError::LengthMismatch {
                expected_len,
                actual_len: data.len(),
            });
        }
        Ok(Self { data, rows, columns })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Intensity at `(row, column)`. Panics when out of bounds.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> u8 {
        assert!(row < self.rows && column < self.columns);
        self.data[row * self.columns + column]
    }

    /// Intensity at `(row, column)`, or `None` outside the image.
    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        if row < self.rows && column < self.columns {
            Some(self.data[row * self.columns + column])
        } else {
            None
        }
    }

    /// Raw row-major pixel buffer.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }
}

#[cfg(feature = "image")]
impl<'a> From<&'a image::GrayImage> for GrayView<'a> {
    fn from(img: &'a image::GrayImage) -> Self {
        Self {
            data: img.as_raw(),
            rows: img.height() as usize,
            columns: img.width() as usize,
        }
    }
}

/// Keypoint position in image coordinates.
///
/// `Keypoint<usize>` is a pixel-grid detection, `Keypoint<f64>` a
/// general-position (sub-pixel) estimate of the same marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint<T> {
    pub row: T,
    pub column: T,
}

impl<T> Keypoint<T> {
    pub fn new(row: T, column: T) -> Self {
        Self { row, column }
    }
}

/// Marker geometry the selector looks for.
///
/// The central disk has radius `min_radius`; `ring_count` annuli of equal
/// width fill the band between `min_radius` and `max_radius`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BullseyeConfig {
    pub min_radius: usize,
    pub max_radius: usize,
    pub ring_count: usize,
    /// Worker threads; config files may omit it.
    #[cfg_attr(feature = "serde", serde(default = "default_threads"))]
    pub n_threads: usize,
}

fn default_threads() -> usize {
    num_cpus::get().max(1)
}

impl BullseyeConfig {
    pub fn new(min_radius: usize, max_radius: usize, ring_count: usize) -> Self {
        Self {
            min_radius,
            max_radius,
            ring_count,
            ..Self::default()
        }
    }

    /// Smallest image side that still leaves one admissible pixel.
    pub fn min_image_size(&self) -> usize {
        2 * self.max_radius + 1
    }
}

impl Default for BullseyeConfig {
    fn default() -> Self {
        Self {
            min_radius: 10,
            max_radius: 15,
            ring_count: 5,
            n_threads: default_threads(),
        }
    }
}

/// Weights of the bullseye score and the minimum score a keypoint must beat.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScoringParams {
    /// Minimum-quality threshold, in intensity units.
    pub min_score: f64,
    /// Weight of the pooled angular standard deviation penalty.
    pub symmetry_weight: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            symmetry_weight: 0.75,
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
