use bullseye_core::{BullseyeConfig, GrayView, Keypoint, ScoringParams};
use log::{debug, trace};

use crate::error::{BullseyeError, BullseyeResult};
use crate::refinement::KeypointRefinement;
use crate::rings::RingLayout;
use crate::scanner::CandidateScanner;
use crate::suppression::NonMaxSuppression;
use crate::types::{Detection, ScoreField, ScoredKeypoint};

/// Largest accepted `max_radius` and exclusion radius. Both size dense
/// offset windows.
pub const MAX_WINDOW_RADIUS: usize = 1024;

/// Stateless bullseye detector: scan, suppress, refine.
#[derive(Debug, Clone)]
pub struct BullseyeDetector {
    cfg: BullseyeConfig,
    scanner: CandidateScanner,
    nms: NonMaxSuppression,
}

impl BullseyeDetector {
    /// Creates a detector with default scoring and an exclusion radius of
    /// `max_radius`.
    pub fn new(cfg: BullseyeConfig) -> BullseyeResult<Self> {
        Self::with_params(cfg, ScoringParams::default(), None)
    }

    /// Creates a detector with validation
    pub fn with_params(
        cfg: BullseyeConfig,
        scoring: ScoringParams,
        exclusion_radius: Option<usize>,
    ) -> BullseyeResult<Self> {
        validate_params(&cfg, &scoring, exclusion_radius)?;

        let layout = RingLayout::new(cfg.min_radius, cfg.max_radius, cfg.ring_count)?;
        let nms = NonMaxSuppression::new(exclusion_radius.unwrap_or(cfg.max_radius), scoring.min_score);
        let scanner = CandidateScanner::new(layout, scoring);

        Ok(Self { cfg, scanner, nms })
    }

    /// Rejects images without a single admissible pixel.
    pub fn validate_image(&self, image: &GrayView) -> BullseyeResult<()> {
        let min_size = self.cfg.min_image_size();
        if image.rows() < min_size || image.columns() < min_size {
            return Err(BullseyeError::ImageTooSmall {
                rows: image.rows(),
                columns: image.columns(),
                min_size,
            });
        }
        Ok(())
    }

    /// Dense score field of `image`.
    pub fn score_field(&self, image: &GrayView) -> BullseyeResult<ScoreField> {
        self.validate_image(image)?;
        Ok(self.scanner.scan(image))
    }

    /// Full pipeline; detections are in `(row, column)` order.
    pub fn detect(&self, image: &GrayView) -> BullseyeResult<Vec<Detection>> {
        let candidates = self.detect_scored(image)?;

        let detections: Vec<Detection> = candidates
            .into_iter()
            .map(|c| {
                let detection = Detection {
                    row: c.keypoint.row,
                    column: c.keypoint.column,
                    offset: [0.0, 0.0],
                    score: c.score,
                };
                KeypointRefinement::refine(&self.scanner, image, detection)
            })
            .collect();

        debug!(
            "bullseye detection on {}x{} image: {} keypoints",
            image.rows(),
            image.columns(),
            detections.len()
        );
        Ok(detections)
    }

    /// Integer keypoints with their scores, without refinement.
    pub fn detect_scored(&self, image: &GrayView) -> BullseyeResult<Vec<ScoredKeypoint>> {
        let field = self.score_field(image)?;
        trace!("score field ready: {} candidates above threshold", field.scored_count());

        let samples = self.nms.suppress(&field);
        trace!("suppression kept {} locations", samples.len());

        Ok(samples
            .into_iter()
            .map(|s| ScoredKeypoint {
                keypoint: Keypoint::new(s.row, s.column),
                score: s.score,
            })
            .collect())
    }

    pub fn detect_keypoints(&self, image: &GrayView) -> BullseyeResult<Vec<Keypoint<usize>>> {
        Ok(self
            .detect_scored(image)?
            .into_iter()
            .map(|sk| sk.keypoint)
            .collect())
    }

    pub fn detect_keypoints_general_position(&self, image: &GrayView) -> BullseyeResult<Vec<Keypoint<f64>>> {
        Ok(self
            .detect(image)?
            .iter()
            .map(Detection::keypoint_general_position)
            .collect())
    }

    /// Score of a single location, without early rejection.
    pub fn score_at(&self, image: &GrayView, row: usize, column: usize) -> Option<f64> {
        self.scanner.score_exact(image, row, column)
    }

    /// Get detector configuration
    pub fn config(&self) -> &BullseyeConfig {
        &self.cfg
    }

    pub fn scoring(&self) -> &ScoringParams {
        self.scanner.scoring()
    }

    pub fn exclusion_radius(&self) -> usize {
        self.nms.radius()
    }

    pub fn ring_layout(&self) -> &RingLayout {
        self.scanner.layout()
    }

    /// Minimum image side accepted by `validate_image`.
    pub fn min_image_size(&self) -> usize {
        self.cfg.min_image_size()
    }
}

/// Parameter checks shared by the detector and configuration files.
pub(crate) fn validate_params(
    cfg: &BullseyeConfig,
    scoring: &ScoringParams,
    exclusion_radius: Option<usize>,
) -> BullseyeResult<()> {
    if cfg.min_radius == 0 || cfg.min_radius >= cfg.max_radius || cfg.max_radius > MAX_WINDOW_RADIUS {
        return Err(BullseyeError::InvalidRadii {
            min_radius: cfg.min_radius,
            max_radius: cfg.max_radius,
        });
    }
    if cfg.ring_count == 0 {
        return Err(BullseyeError::InvalidRingCount(cfg.ring_count));
    }
    if !scoring.min_score.is_finite()
        || scoring.min_score <= 0.0
        || !scoring.symmetry_weight.is_finite()
        || scoring.symmetry_weight < 0.0
    {
        return Err(BullseyeError::InvalidScoring {
            min_score: scoring.min_score,
            symmetry_weight: scoring.symmetry_weight,
        });
    }
    if let Some(radius) = exclusion_radius {
        if radius == 0 || radius > MAX_WINDOW_RADIUS {
            return Err(BullseyeError::InvalidExclusionRadius(radius));
        }
    }
    Ok(())
}
