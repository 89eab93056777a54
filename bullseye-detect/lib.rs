//! Concentric-ring ("bullseye") fiducial detection.
//!
//! The pipeline has three stages:
//!
//! - [`scanner`] scores every pixel at least `max_radius` from the border by
//!   sampling a central disk and `ring_count` annuli ([`rings`]); the score
//!   rewards alternating contrast between neighbouring regions and penalises
//!   angular variance inside each region. Samples near a region boundary are
//!   down-weighted, so off-grid and anti-aliased markers still score.
//! - [`suppression`] thresholds the score field and keeps strict local maxima
//!   within the exclusion radius, breaking ties towards the smallest
//!   `(row, column)`.
//! - [`refinement`] rescores each keypoint on a sub-pixel grid of recentred
//!   sampling patterns and fits a quadratic around the best grid point.
//!
//! [`BullseyeDetector`] runs the pipeline on any image; [`BullseyeSelector`]
//! binds one image at a time and memoizes its keypoints.

pub mod error;
pub mod types;
pub mod rings;
pub mod scanner;
pub mod suppression;
pub mod refinement;
pub mod detector;
pub mod selector;
pub mod config;
pub mod builder;
pub mod configured_detector;
pub mod synthetic;

pub use error::{BullseyeError, BullseyeResult};
pub use types::{Detection, ScoreField, ScoreSample, ScoredKeypoint};
pub use rings::{RingLayout, RingSample, SECTOR_COUNT};
pub use scanner::CandidateScanner;
pub use suppression::NonMaxSuppression;
pub use refinement::KeypointRefinement;
pub use detector::{BullseyeDetector, MAX_WINDOW_RADIUS};
pub use selector::BullseyeSelector;
pub use config::DetectorConfig;
#[cfg(feature = "serde")]
pub use config::ConfigFileError;
pub use builder::SelectorBuilder;
pub use configured_detector::ConfiguredDetector;

pub use bullseye_core::{BullseyeConfig, GrayView, Keypoint, ScoringParams};
