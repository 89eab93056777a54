use bullseye_core::{BullseyeConfig, ScoringParams};
use crate::builder::SelectorBuilder;
use crate::detector::validate_params;
use crate::error::BullseyeResult;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

/// Errors raised while reading or writing configuration files.
#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] crate::error::BullseyeError),
}

/// Complete detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Suppression radius; `None` means `max_radius`
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub exclusion_radius: Option<usize>,
    pub subpixel_refinement: bool,
    /// Metadata
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub version: Option<String>,
    /// Marker geometry
    pub core: BullseyeConfig,
    pub scoring: ScoringParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::reference_preset()
    }
}

impl DetectorConfig {
    /// Configuration for the given marker geometry with default scoring.
    pub fn new(min_radius: usize, max_radius: usize, ring_count: usize) -> Self {
        Self {
            core: BullseyeConfig::new(min_radius, max_radius, ring_count),
            scoring: ScoringParams::default(),
            exclusion_radius: None,
            subpixel_refinement: true,
            name: None,
            description: None,
            version: None,
        }
    }

    /// Thin-ring target: 10 px disk, five 1 px annuli out to 15 px
    pub fn reference_preset() -> Self {
        Self {
            name: Some("Reference".to_string()),
            description: Some("Central disk of radius 10 with five 1 px annuli".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(10, 15, 5)
        }
    }

    /// Wide printed rings, tolerant of blur
    pub fn coarse_preset() -> Self {
        Self {
            name: Some("Coarse".to_string()),
            description: Some("Central disk of radius 6 with three 6 px annuli".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(6, 24, 3)
        }
    }

    /// Reference geometry with a stricter quality threshold
    pub fn strict_preset() -> Self {
        Self {
            scoring: ScoringParams {
                min_score: 60.0,
                symmetry_weight: 2.0,
            },
            name: Some("Strict".to_string()),
            description: Some("Reference geometry, high contrast and symmetry required".to_string()),
            version: Some("1.0".to_string()),
            ..Self::new(10, 15, 5)
        }
    }

    /// Look a preset up by name (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "reference" => Some(Self::reference_preset()),
            "coarse" => Some(Self::coarse_preset()),
            "strict" => Some(Self::strict_preset()),
            _ => None,
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to SelectorBuilder for further customization
    pub fn to_builder(self) -> SelectorBuilder {
        SelectorBuilder::from_config(self)
    }

    /// Suppression radius in effect.
    pub fn effective_exclusion_radius(&self) -> usize {
        self.exclusion_radius.unwrap_or(self.core.max_radius)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: radii={}..{}, rings={}, min_score={:.1}, symmetry_weight={:.2}, exclusion={}, subpixel={}",
            self.core.min_radius, self.core.max_radius, self.core.ring_count,
            self.scoring.min_score, self.scoring.symmetry_weight,
            self.effective_exclusion_radius(), self.subpixel_refinement
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> BullseyeResult<()> {
        validate_params(&self.core, &self.scoring, self.exclusion_radius)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a `.json` or `.toml` file, chosen by extension.
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_json(path),
            _ => Self::load_toml(path),
        }
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigFileError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
