//! High-level wrapper used by the `bullseye` binary: image loading, detection
//! reports and keypoint overlays.

use std::path::Path;

use bullseye_core::{init_thread_pool, GrayView, Keypoint};
use bullseye_detect::{BullseyeError, ConfigFileError, ConfiguredDetector, DetectorConfig, ScoredKeypoint};
use image::{GrayImage, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_circle_mut};
use log::{debug, info};
use serde::Serialize;

pub use bullseye_core;
pub use bullseye_detect;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("detector error: {0}")]
    Bullseye(#[from] BullseyeError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration file error: {0}")]
    ConfigFile(#[from] ConfigFileError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("unknown preset '{0}' (expected reference, coarse or strict)")]
    UnknownPreset(String),
}

pub type CliResult<T> = Result<T, CliError>;

/// One reported marker.
#[derive(Debug, Clone, Serialize)]
pub struct KeypointRecord {
    pub row: usize,
    pub column: usize,
    pub row_subpixel: f64,
    pub column_subpixel: f64,
    pub score: f64,
}

/// Everything the `detect` command prints.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub rows: usize,
    pub columns: usize,
    pub config: DetectorConfig,
    pub keypoints: Vec<KeypointRecord>,
}

impl DetectionReport {
    pub fn integer_keypoints(&self) -> Vec<Keypoint<usize>> {
        self.keypoints.iter().map(|k| Keypoint::new(k.row, k.column)).collect()
    }

    /// Plain-text listing, one marker per line.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{} keypoint(s) in {}x{} image\n",
            self.keypoints.len(),
            self.rows,
            self.columns
        );
        for kp in &self.keypoints {
            out.push_str(&format!(
                "row={} column={} subpixel=({:.3}, {:.3}) score={:.2}\n",
                kp.row, kp.column, kp.row_subpixel, kp.column_subpixel, kp.score
            ));
        }
        out
    }
}

/// Load an image from disk and convert it to 8-bit grayscale.
pub fn load_gray<P: AsRef<Path>>(path: P) -> CliResult<GrayImage> {
    let path = path.as_ref();
    info!("Loading image: {}", path.display());
    let img = ImageReader::open(path)?.decode()?.to_luma8();
    debug!("Image size: {}x{}", img.height(), img.width());
    Ok(img)
}

/// Resolve a preset name to its configuration.
pub fn preset_config(name: &str) -> CliResult<DetectorConfig> {
    DetectorConfig::preset(name).ok_or_else(|| CliError::UnknownPreset(name.to_string()))
}

/// Build a detector from `config`, sizing the global thread pool first.
pub fn configure(config: DetectorConfig) -> CliResult<ConfiguredDetector> {
    config.validate()?;
    // The global pool can only be built once per process.
    if let Err(err) = init_thread_pool(config.core.n_threads) {
        debug!("Keeping existing thread pool: {}", err);
    }
    Ok(config.to_builder().build()?)
}

/// Bind `image` to a selector and collect both keypoint views.
pub fn run_detection(detector: &ConfiguredDetector, config: DetectorConfig, image: &GrayImage) -> CliResult<DetectionReport> {
    let view = GrayView::from(image);
    let mut selector = detector.selector();
    selector.set_image(view)?;

    let scored: Vec<ScoredKeypoint> = selector.get_scored_keypoints()?;
    let general = if detector.refines_subpixel() {
        selector.get_keypoints_general_position()?
    } else {
        scored
            .iter()
            .map(|s| Keypoint::new(s.keypoint.row as f64, s.keypoint.column as f64))
            .collect()
    };

    let keypoints = scored
        .iter()
        .zip(general)
        .map(|(s, gp)| KeypointRecord {
            row: s.keypoint.row,
            column: s.keypoint.column,
            row_subpixel: gp.row,
            column_subpixel: gp.column,
            score: s.score,
        })
        .collect::<Vec<_>>();
    info!("Detected {} keypoint(s)", keypoints.len());

    Ok(DetectionReport {
        rows: view.rows(),
        columns: view.columns(),
        config,
        keypoints,
    })
}

/// Draw each keypoint as a red circle of the marker's outer radius with a
/// cross at the sub-pixel center.
pub fn draw_keypoints(image: &GrayImage, report: &DetectionReport) -> RgbaImage {
    let mut output: RgbaImage = image::DynamicImage::ImageLuma8(image.clone()).into_rgba8();
    let radius = report.config.core.max_radius as i32;
    for kp in &report.keypoints {
        let center = (kp.column_subpixel.round() as i32, kp.row_subpixel.round() as i32);
        draw_hollow_circle_mut(&mut output, center, radius, Rgba([255, 0, 0, 255]));
        draw_cross_mut(&mut output, Rgba([0, 255, 0, 255]), center.0, center.1);
    }
    output
}

/// Serialize `config` as TOML or pretty JSON.
pub fn render_config(config: &DetectorConfig, json: bool) -> CliResult<String> {
    if json {
        Ok(config.to_json()?)
    } else {
        Ok(config.to_toml()?)
    }
}
