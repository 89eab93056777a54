use bullseye_core::{BullseyeConfig, ScoringParams};
use crate::error::BullseyeResult;
use crate::detector::BullseyeDetector;
use crate::config::DetectorConfig;
use crate::configured_detector::ConfiguredDetector;

/// Builder for creating a `ConfiguredDetector`
#[derive(Debug, Clone)]
pub struct SelectorBuilder {
    config: BullseyeConfig,
    scoring: ScoringParams,
    exclusion_radius: Option<usize>,
    subpixel_refinement: bool,
}

impl Default for SelectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorBuilder {
    /// Create a new builder with the reference geometry
    pub fn new() -> Self {
        Self {
            config: BullseyeConfig::default(),
            scoring: ScoringParams::default(),
            exclusion_radius: None,
            subpixel_refinement: true,
        }
    }

    /// Set the central disk radius
    pub fn min_radius(mut self, radius: usize) -> Self {
        self.config.min_radius = radius;
        self
    }

    /// Set the outer radius of the last annulus
    pub fn max_radius(mut self, radius: usize) -> Self {
        self.config.max_radius = radius;
        self
    }

    /// Set the number of annuli between the two radii
    pub fn ring_count(mut self, count: usize) -> Self {
        self.config.ring_count = count;
        self
    }

    /// Set all three geometry parameters at once
    pub fn radii(self, min_radius: usize, max_radius: usize, ring_count: usize) -> Self {
        self.min_radius(min_radius)
            .max_radius(max_radius)
            .ring_count(ring_count)
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Set the minimum-quality threshold
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.scoring.min_score = min_score;
        self
    }

    /// Set the weight of the symmetry penalty
    pub fn symmetry_weight(mut self, weight: f64) -> Self {
        self.scoring.symmetry_weight = weight;
        self
    }

    /// Set the suppression radius (defaults to `max_radius`)
    pub fn exclusion_radius(mut self, radius: usize) -> Self {
        self.exclusion_radius = Some(radius);
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.subpixel_refinement = enable;
        self
    }

    fn apply_preset(self, preset: DetectorConfig) -> Self {
        let n_threads = self.config.n_threads;
        let mut builder = Self::from_config(preset);
        builder.config.n_threads = n_threads;
        builder
    }

    /// Apply the reference preset
    pub fn preset_reference(self) -> Self {
        self.apply_preset(DetectorConfig::reference_preset())
    }

    /// Apply the coarse preset
    pub fn preset_coarse(self) -> Self {
        self.apply_preset(DetectorConfig::coarse_preset())
    }

    /// Apply the strict preset
    pub fn preset_strict(self) -> Self {
        self.apply_preset(DetectorConfig::strict_preset())
    }

    /// Build the `ConfiguredDetector`
    pub fn build(self) -> BullseyeResult<ConfiguredDetector> {
        let detector = BullseyeDetector::with_params(
            self.config.clone(),
            self.scoring.clone(),
            self.exclusion_radius,
        )?;
        Ok(ConfiguredDetector {
            detector,
            config: self,
        })
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        format!(
            "SelectorBuilder: radii={}..{}, rings={}, threads={}, min_score={:.1}, symmetry_weight={:.2}, exclusion={:?}, subpixel={}",
            self.config.min_radius, self.config.max_radius, self.config.ring_count, self.config.n_threads,
            self.scoring.min_score, self.scoring.symmetry_weight,
            self.exclusion_radius, self.subpixel_refinement
        )
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self {
            config: config.core,
            scoring: config.scoring,
            exclusion_radius: config.exclusion_radius,
            subpixel_refinement: config.subpixel_refinement,
        }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        DetectorConfig {
            core: self.config,
            scoring: self.scoring,
            exclusion_radius: self.exclusion_radius,
            subpixel_refinement: self.subpixel_refinement,
            name: None,
            description: None,
            version: None,
        }
    }

    pub fn refines_subpixel(&self) -> bool {
        self.subpixel_refinement
    }

    pub fn threads_requested(&self) -> usize {
        self.config.n_threads
    }
}
