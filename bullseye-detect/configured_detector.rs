use bullseye_core::{GrayView, Keypoint};
use crate::error::BullseyeResult;
use crate::types::{Detection, ScoredKeypoint};
use crate::detector::BullseyeDetector;
use crate::builder::SelectorBuilder;
use crate::selector::BullseyeSelector;

/// A bullseye detector that has been configured with a specific builder.
///
/// This struct holds a `BullseyeDetector` and a `SelectorBuilder`,
/// providing a convenient way to run the detector and access its configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredDetector {
    pub(crate) detector: BullseyeDetector,
    pub(crate) config: SelectorBuilder,
}

impl ConfiguredDetector {
    /// Detect keypoints in the given image.
    ///
    /// Positions are sub-pixel when refinement is enabled, otherwise the
    /// integer detections converted to `f64`.
    pub fn detect_keypoints(&self, img: &GrayView) -> BullseyeResult<Vec<Keypoint<f64>>> {
        if self.config.refines_subpixel() {
            return self.detector.detect_keypoints_general_position(img);
        }
        Ok(self
            .detector
            .detect_keypoints(img)?
            .into_iter()
            .map(|kp| Keypoint::new(kp.row as f64, kp.column as f64))
            .collect())
    }

    /// Detect keypoints with their bullseye scores.
    pub fn detect_keypoints_with_score(&self, img: &GrayView) -> BullseyeResult<Vec<ScoredKeypoint>> {
        self.detector.detect_scored(img)
    }

    /// Full detection records, refined or not depending on the configuration.
    pub fn detect(&self, img: &GrayView) -> BullseyeResult<Vec<Detection>> {
        if self.config.refines_subpixel() {
            return self.detector.detect(img);
        }
        Ok(self
            .detector
            .detect_scored(img)?
            .into_iter()
            .map(|sk| Detection {
                row: sk.keypoint.row,
                column: sk.keypoint.column,
                offset: [0.0, 0.0],
                score: sk.score,
            })
            .collect())
    }

    /// A fresh, unbound selector sharing this configuration.
    pub fn selector<'a>(&self) -> BullseyeSelector<'a> {
        BullseyeSelector::from_detector(self.detector.clone())
    }

    /// Get a reference to the underlying `BullseyeDetector`.
    pub fn detector(&self) -> &BullseyeDetector {
        &self.detector
    }

    /// Get a summary of the detector's configuration.
    pub fn config_summary(&self) -> String {
        self.config.summary()
    }

    pub fn refines_subpixel(&self) -> bool {
        self.config.refines_subpixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{render_bullseye, uniform_image, BullseyeTarget};

    #[test]
    fn test_unrefined_positions_are_integral() {
        let configured = SelectorBuilder::new()
            .radii(3, 9, 3)
            .subpixel_refinement(false)
            .build()
            .unwrap();
        let mut img = uniform_image(40, 40, 128);
        let target = BullseyeTarget::for_config(configured.detector().config(), 20.3, 18.8);
        render_bullseye(&mut img, 40, 40, &target, 4);
        let view = GrayView::new(&img, 40, 40).unwrap();

        let keypoints = configured.detect_keypoints(&view).unwrap();
        assert_eq!(keypoints, vec![Keypoint::new(20.0, 19.0)]);
        assert_eq!(configured.detect(&view).unwrap()[0].offset, [0.0, 0.0]);
    }

    #[test]
    fn test_selector_shares_configuration() {
        let configured = SelectorBuilder::new().radii(3, 9, 3).min_score(42.0).build().unwrap();
        let mut img = uniform_image(40, 40, 128);
        let target = BullseyeTarget::for_config(configured.detector().config(), 17.6, 22.1);
        render_bullseye(&mut img, 40, 40, &target, 4);
        let view = GrayView::new(&img, 40, 40).unwrap();

        let mut selector = configured.selector();
        assert_eq!(selector.detector().scoring().min_score, 42.0);
        selector.set_image(view).unwrap();
        let from_selector = selector.get_keypoints_general_position().unwrap();
        assert_eq!(from_selector, configured.detect_keypoints(&view).unwrap());
        assert!(configured.config_summary().contains("min_score=42.0"));
    }
}
