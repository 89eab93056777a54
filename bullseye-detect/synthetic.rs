//! Synthetic bullseye rendering for tests, benchmarks and demos.
//!
//! Targets are painted from their own continuous geometry, not from a
//! detector's sampling pattern, so the center may sit anywhere inside a
//! pixel and edges may be anti-aliased.

use bullseye_core::BullseyeConfig;

/// A bullseye to paint: a disk of `disk_radius` followed by `ring_count`
/// equal-width annuli out to `outer_radius`, alternating between the two
/// intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BullseyeTarget {
    /// Center in pixel coordinates; pixel `(r, c)` covers `[r - 0.5, r + 0.5)`.
    pub row: f64,
    pub column: f64,
    pub disk_radius: f64,
    pub outer_radius: f64,
    pub ring_count: usize,
    pub dark: u8,
    pub bright: u8,
    /// Paint the central disk dark (otherwise bright).
    pub dark_center: bool,
}

impl BullseyeTarget {
    pub fn new(row: f64, column: f64, disk_radius: f64, outer_radius: f64, ring_count: usize) -> Self {
        Self {
            row,
            column,
            disk_radius,
            outer_radius,
            ring_count,
            dark: 30,
            bright: 220,
            dark_center: true,
        }
    }

    /// A target of the marker geometry described by `cfg`.
    pub fn for_config(cfg: &BullseyeConfig, row: f64, column: f64) -> Self {
        Self::new(row, column, cfg.min_radius as f64, cfg.max_radius as f64, cfg.ring_count)
    }

    /// Intensity at distance `d` from the center, `None` outside the target.
    pub fn intensity_at(&self, d: f64) -> Option<u8> {
        if d >= self.outer_radius || self.ring_count == 0 {
            return None;
        }
        let band = if d < self.disk_radius {
            0
        } else {
            let width = (self.outer_radius - self.disk_radius) / self.ring_count as f64;
            (((d - self.disk_radius) / width) as usize + 1).min(self.ring_count)
        };
        Some(if (band % 2 == 0) == self.dark_center { self.dark } else { self.bright })
    }
}

/// Row-major image filled with `value`.
pub fn uniform_image(rows: usize, columns: usize, value: u8) -> Vec<u8> {
    vec![value; rows * columns]
}

/// Paint `target` into `buffer`.
///
/// Each pixel averages `supersample x supersample` evenly spaced points of
/// its cell; points outside the target keep the pixel's current value, so
/// edges blend into the background. `supersample <= 1` samples the pixel
/// center only. Pixels outside the image are skipped.
pub fn render_bullseye(
    buffer: &mut [u8],
    rows: usize,
    columns: usize,
    target: &BullseyeTarget,
    supersample: usize,
) {
    let ss = supersample.max(1);
    let reach = target.outer_radius + 1.0;
    let row_range = pixel_range(target.row, reach, rows);
    let column_range = pixel_range(target.column, reach, columns);

    for row in row_range {
        for column in column_range.clone() {
            let index = row * columns + column;
            let background = buffer[index] as f64;
            let mut acc = 0.0;
            for i in 0..ss {
                for j in 0..ss {
                    let y = row as f64 + (i as f64 + 0.5) / ss as f64 - 0.5 - target.row;
                    let x = column as f64 + (j as f64 + 0.5) / ss as f64 - 0.5 - target.column;
                    acc += target
                        .intensity_at((y * y + x * x).sqrt())
                        .map_or(background, f64::from);
                }
            }
            buffer[index] = (acc / (ss * ss) as f64).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn pixel_range(center: f64, reach: f64, len: usize) -> std::ops::Range<usize> {
    let start = (center - reach).floor().max(0.0) as usize;
    let end = ((center + reach).ceil().max(0.0) as usize + 1).min(len);
    start.min(end)..end
}
