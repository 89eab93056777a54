use std::cell::OnceCell;

use bullseye_core::{BullseyeConfig, GrayView, Keypoint};
use log::debug;

use crate::detector::BullseyeDetector;
use crate::error::{BullseyeError, BullseyeResult};
use crate::types::{Detection, ScoreField, ScoredKeypoint};

/// Bullseye keypoint selector bound to one image at a time.
///
/// The selector borrows the image given to [`set_image`](Self::set_image) and
/// memoizes its detections until the next binding. Both keypoint forms come
/// from the same detection list, so they always have the same length and
/// order. Querying before any image is bound returns
/// [`BullseyeError::NotReady`].
///
/// ```
/// use bullseye_core::{BullseyeConfig, GrayView};
/// use bullseye_detect::BullseyeSelector;
///
/// let pixels = vec![128u8; 64 * 64];
/// let image = GrayView::new(&pixels, 64, 64).unwrap();
///
/// let mut selector = BullseyeSelector::new(BullseyeConfig::new(10, 15, 5)).unwrap();
/// selector.set_image(image).unwrap();
/// assert!(selector.get_keypoints().unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BullseyeSelector<'a> {
    detector: BullseyeDetector,
    image: Option<GrayView<'a>>,
    detections: OnceCell<Vec<Detection>>,
}

impl<'a> BullseyeSelector<'a> {
    pub fn new(cfg: BullseyeConfig) -> BullseyeResult<Self> {
        Ok(Self::from_detector(BullseyeDetector::new(cfg)?))
    }

    pub fn from_detector(detector: BullseyeDetector) -> Self {
        Self {
            detector,
            image: None,
            detections: OnceCell::new(),
        }
    }

    /// Bind a new image, dropping memoized results. An undersized image is
    /// rejected and the current binding is kept.
    pub fn set_image(&mut self, image: GrayView<'a>) -> BullseyeResult<()> {
        self.detector.validate_image(&image)?;
        self.image = Some(image);
        self.detections = OnceCell::new();
        Ok(())
    }

    /// Return to the unbound state.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.detections = OnceCell::new();
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Integer keypoints of the bound image.
    pub fn get_keypoints(&self) -> BullseyeResult<Vec<Keypoint<usize>>> {
        Ok(self.detections()?.iter().map(Detection::keypoint).collect())
    }

    /// Sub-pixel keypoints, element-for-element with [`get_keypoints`](Self::get_keypoints).
    pub fn get_keypoints_general_position(&self) -> BullseyeResult<Vec<Keypoint<f64>>> {
        Ok(self
            .detections()?
            .iter()
            .map(Detection::keypoint_general_position)
            .collect())
    }

    pub fn get_scored_keypoints(&self) -> BullseyeResult<Vec<ScoredKeypoint>> {
        Ok(self
            .detections()?
            .iter()
            .map(|d| ScoredKeypoint {
                keypoint: d.keypoint(),
                score: d.score,
            })
            .collect())
    }

    /// Memoized detections for the bound image.
    pub fn detections(&self) -> BullseyeResult<&[Detection]> {
        let image = self.image.as_ref().ok_or(BullseyeError::NotReady)?;
        if let Some(cached) = self.detections.get() {
            return Ok(cached);
        }

        let computed = self.detector.detect(image)?;
        debug!("memoized {} detections for bound image", computed.len());
        Ok(self.detections.get_or_init(|| computed))
    }

    /// Dense score field of the bound image. Not memoized.
    pub fn score_field(&self) -> BullseyeResult<ScoreField> {
        let image = self.image.as_ref().ok_or(BullseyeError::NotReady)?;
        self.detector.score_field(image)
    }

    pub fn config(&self) -> &BullseyeConfig {
        self.detector.config()
    }

    pub fn detector(&self) -> &BullseyeDetector {
        &self.detector
    }

    /// `(rows, columns)` of the bound image.
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.image.as_ref().map(|img| (img.rows(), img.columns()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{render_bullseye, uniform_image, BullseyeTarget};

    fn config() -> BullseyeConfig {
        BullseyeConfig {
            min_radius: 4,
            max_radius: 10,
            ring_count: 3,
            n_threads: 1,
        }
    }

    fn target_image(selector: &BullseyeSelector, rows: usize, columns: usize, at: (f64, f64)) -> Vec<u8> {
        let mut img = uniform_image(rows, columns, 128);
        let target = BullseyeTarget::for_config(selector.detector().config(), at.0, at.1);
        render_bullseye(&mut img, rows, columns, &target, 4);
        img
    }

    #[test]
    fn test_not_ready_before_binding() {
        let selector = BullseyeSelector::new(config()).unwrap();
        assert!(!selector.has_image());
        assert_eq!(selector.get_keypoints(), Err(BullseyeError::NotReady));
        assert_eq!(
            selector.get_keypoints_general_position(),
            Err(BullseyeError::NotReady)
        );
        assert!(matches!(selector.score_field(), Err(BullseyeError::NotReady)));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut cfg = config();
        cfg.max_radius = 4;
        assert!(matches!(
            BullseyeSelector::new(cfg),
            Err(BullseyeError::InvalidRadii { .. })
        ));
    }

    #[test]
    fn test_undersized_image_keeps_unbound_state() {
        let mut selector = BullseyeSelector::new(config()).unwrap();
        let small = uniform_image(20, 40, 0);
        let view = GrayView::new(&small, 20, 40).unwrap();
        assert!(matches!(
            selector.set_image(view),
            Err(BullseyeError::ImageTooSmall { min_size: 21, .. })
        ));
        assert!(!selector.has_image());
        assert_eq!(selector.get_keypoints(), Err(BullseyeError::NotReady));
    }

    #[test]
    fn test_undersized_image_keeps_previous_binding() {
        let mut selector = BullseyeSelector::new(config()).unwrap();
        let img = target_image(&selector, 40, 40, (20.2, 17.9));
        selector.set_image(GrayView::new(&img, 40, 40).unwrap()).unwrap();
        let before = selector.get_keypoints().unwrap();
        assert_eq!(before, vec![Keypoint::new(20, 18)]);

        let small = uniform_image(10, 10, 0);
        assert!(selector.set_image(GrayView::new(&small, 10, 10).unwrap()).is_err());
        assert_eq!(selector.dimensions(), Some((40, 40)));
        assert_eq!(selector.get_keypoints().unwrap(), before);
    }

    #[test]
    fn test_rebinding_invalidates_memo() {
        let mut selector = BullseyeSelector::new(config()).unwrap();
        let first = target_image(&selector, 40, 40, (15.0, 15.0));
        let second = target_image(&selector, 40, 40, (24.7, 22.3));

        selector.set_image(GrayView::new(&first, 40, 40).unwrap()).unwrap();
        assert_eq!(selector.get_keypoints().unwrap(), vec![Keypoint::new(15, 15)]);

        selector.set_image(GrayView::new(&second, 40, 40).unwrap()).unwrap();
        assert_eq!(selector.get_keypoints().unwrap(), vec![Keypoint::new(25, 22)]);

        selector.clear_image();
        assert_eq!(selector.get_keypoints(), Err(BullseyeError::NotReady));
    }

    #[test]
    fn test_memoized_results_are_stable() {
        let mut selector = BullseyeSelector::new(config()).unwrap();
        let img = target_image(&selector, 50, 45, (24.4, 19.8));
        selector.set_image(GrayView::new(&img, 50, 45).unwrap()).unwrap();

        let first = selector.detections().unwrap().as_ptr();
        let second = selector.detections().unwrap().as_ptr();
        assert_eq!(first, second);
        assert_eq!(selector.get_keypoints().unwrap(), selector.get_keypoints().unwrap());
    }

    #[test]
    fn test_general_position_matches_integer_set() {
        let mut selector = BullseyeSelector::new(config()).unwrap();
        let img = target_image(&selector, 50, 45, (24.4, 19.8));
        selector.set_image(GrayView::new(&img, 50, 45).unwrap()).unwrap();

        let integer = selector.get_keypoints().unwrap();
        let general = selector.get_keypoints_general_position().unwrap();
        let scored = selector.get_scored_keypoints().unwrap();
        assert_eq!(integer.len(), general.len());
        assert_eq!(integer.len(), scored.len());
        assert_eq!(integer, vec![Keypoint::new(24, 20)]);
        assert!((general[0].row - 24.4).abs() < 0.15);
        assert!((general[0].column - 19.8).abs() < 0.15);
        for ((i, g), s) in integer.iter().zip(&general).zip(&scored) {
            assert!((g.row - i.row as f64).abs() <= 0.5);
            assert!((g.column - i.column as f64).abs() <= 0.5);
            assert_eq!(s.keypoint, *i);
        }
    }
}
