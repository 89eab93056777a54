use bullseye_core::GrayView;
use log::trace;

use crate::scanner::CandidateScanner;
use crate::types::Detection;

/// Largest offset, per axis, refinement may move a keypoint.
pub const MAX_OFFSET: f64 = 0.5;

const DET_EPSILON: f64 = 1e-9;

/// Half-width, in grid steps, of the sub-pixel search grid.
const GRID_HALF_STEPS: i32 = 4;

/// Spacing of the search grid; the grid spans `[-MAX_OFFSET, MAX_OFFSET]`.
const GRID_STEP: f64 = MAX_OFFSET / GRID_HALF_STEPS as f64;

/// Subpixel refinement of integer detections
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine a detection to subpixel accuracy.
    ///
    /// The sampling pattern is recentred on a 9x9 grid of sub-pixel offsets
    /// around the detection and scored exactly at each. The best grid point
    /// is then polished with a quadratic fit to its 3x3 grid neighbourhood.
    /// Pixels are never interpolated. When no grid point scores, the integer
    /// position is kept.
    pub fn refine(scanner: &CandidateScanner, image: &GrayView, detection: Detection) -> Detection {
        let (row, column) = (detection.row, detection.column);
        let mut layout = scanner.layout().clone();
        let mut steps = Vec::with_capacity(layout.ring_count());

        let n = GRID_HALF_STEPS;
        let size = (2 * n + 1) as usize;
        let mut grid = vec![f64::NEG_INFINITY; size * size];
        for i in -n..=n {
            for j in -n..=n {
                layout.recenter([i as f64 * GRID_STEP, j as f64 * GRID_STEP]);
                if let Some(score) = scanner.score_recentered(&layout, image, row, column, &mut steps) {
                    grid[(i + n) as usize * size + (j + n) as usize] = score;
                }
            }
        }
        let at = |i: i32, j: i32| grid[(i + n) as usize * size + (j + n) as usize];

        // Only a strictly better score moves away from the centre cell.
        let (mut best_i, mut best_j) = (0, 0);
        for i in -n..=n {
            for j in -n..=n {
                if at(i, j) > at(best_i, best_j) {
                    (best_i, best_j) = (i, j);
                }
            }
        }
        if !at(best_i, best_j).is_finite() {
            trace!("no finite score around ({row}, {column}), keeping integer position");
            return detection;
        }

        let mut offset = [best_i as f64 * GRID_STEP, best_j as f64 * GRID_STEP];
        if best_i.abs() < n && best_j.abs() < n {
            let mut block = [[0.0; 3]; 3];
            for (a, block_row) in block.iter_mut().enumerate() {
                for (b, cell) in block_row.iter_mut().enumerate() {
                    *cell = at(best_i + a as i32 - 1, best_j + b as i32 - 1);
                }
            }
            match Self::quadratic_peak_offset(&block) {
                Some([dy, dx]) => {
                    offset[0] += dy * GRID_STEP;
                    offset[1] += dx * GRID_STEP;
                }
                None => trace!(
                    "degenerate quadratic fit at ({row}, {column}), keeping grid offset {offset:?}"
                ),
            }
        }

        Detection {
            offset: [
                offset[0].clamp(-MAX_OFFSET, MAX_OFFSET),
                offset[1].clamp(-MAX_OFFSET, MAX_OFFSET),
            ],
            ..detection
        }
    }

    /// Offset `(row, column)` of the peak of the quadratic through a 3x3 block
    /// indexed `[row][column]`, clamped to `MAX_OFFSET` per axis. `None` when
    /// the block is not a strict peak or the fit is singular.
    pub fn quadratic_peak_offset(samples: &[[f64; 3]; 3]) -> Option<[f64; 2]> {
        // f(x, y) = Ax² + By² + Cxy + Dx + Ey + F, x along columns, y along rows
        let dx = (samples[1][2] - samples[1][0]) / 2.0;
        let dy = (samples[2][1] - samples[0][1]) / 2.0;
        let dxx = samples[1][2] - 2.0 * samples[1][1] + samples[1][0];
        let dyy = samples[2][1] - 2.0 * samples[1][1] + samples[0][1];
        let dxy = (samples[2][2] - samples[2][0] - samples[0][2] + samples[0][0]) / 4.0;

        let det = dxx * dyy - dxy * dxy;

        // negative definite Hessian only
        if !(dxx < 0.0) || det <= DET_EPSILON {
            return None;
        }

        let offset_x = -(dyy * dx - dxy * dy) / det;
        let offset_y = -(dxx * dy - dxy * dx) / det;

        if !offset_x.is_finite() || !offset_y.is_finite() {
            return None;
        }

        Some([
            offset_y.clamp(-MAX_OFFSET, MAX_OFFSET),
            offset_x.clamp(-MAX_OFFSET, MAX_OFFSET),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bullseye_core::ScoringParams;
    use crate::rings::RingLayout;
    use crate::synthetic::{render_bullseye, uniform_image, BullseyeTarget};

    fn detection(row: usize, column: usize, score: f64) -> Detection {
        Detection { row, column, offset: [0.0, 0.0], score }
    }

    fn refine_marker(row: f64, column: f64, supersample: usize) -> Detection {
        let scanner = CandidateScanner::new(RingLayout::new(10, 15, 5).unwrap(), ScoringParams::default());
        let mut img = uniform_image(60, 60, 128);
        render_bullseye(&mut img, 60, 60, &BullseyeTarget::new(row, column, 10.0, 15.0, 5), supersample);
        let view = GrayView::new(&img, 60, 60).unwrap();
        let (r, c) = (row.round() as usize, column.round() as usize);
        let score = scanner.score_exact(&view, r, c).unwrap();
        KeypointRefinement::refine(&scanner, &view, detection(r, c, score))
    }

    fn sample(f: impl Fn(f64, f64) -> f64) -> [[f64; 3]; 3] {
        let mut s = [[0.0; 3]; 3];
        for (i, row) in s.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = f(j as f64 - 1.0, i as f64 - 1.0);
            }
        }
        s
    }

    #[test]
    fn test_recovers_quadratic_peak() {
        let s = sample(|x, y| 50.0 - (x - 0.3).powi(2) - 2.0 * (y + 0.2).powi(2));
        let [row, column] = KeypointRefinement::quadratic_peak_offset(&s).unwrap();
        assert!((row + 0.2).abs() < 1e-9);
        assert!((column - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_recovers_rotated_peak() {
        let s = sample(|x, y| 10.0 - (x - 0.1).powi(2) - (y - 0.25).powi(2) - 0.5 * (x - 0.1) * (y - 0.25));
        let [row, column] = KeypointRefinement::quadratic_peak_offset(&s).unwrap();
        assert!((row - 0.25).abs() < 1e-9);
        assert!((column - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_offset_is_clamped() {
        let s = sample(|x, y| -(x - 3.0).powi(2) - y * y);
        let [row, column] = KeypointRefinement::quadratic_peak_offset(&s).unwrap();
        assert_eq!(column, MAX_OFFSET);
        assert!(row.abs() < 1e-12);
    }

    #[test]
    fn test_flat_block_is_degenerate() {
        let s = [[4.0; 3]; 3];
        assert!(KeypointRefinement::quadratic_peak_offset(&s).is_none());
    }

    #[test]
    fn test_saddle_and_minimum_are_rejected() {
        let saddle = sample(|x, y| x * x - y * y);
        assert!(KeypointRefinement::quadratic_peak_offset(&saddle).is_none());
        let bowl = sample(|x, y| x * x + y * y);
        assert!(KeypointRefinement::quadratic_peak_offset(&bowl).is_none());
    }

    #[test]
    fn test_non_finite_scores_are_degenerate() {
        let mut s = sample(|x, y| -(x * x) - y * y);
        s[0][0] = f64::NAN;
        assert!(KeypointRefinement::quadratic_peak_offset(&s).is_none());
    }

    #[test]
    fn test_refinement_recovers_off_grid_centres() {
        for (row, column) in [(30.0, 30.0), (30.3, 29.6), (29.55, 30.45), (30.125, 30.375)] {
            for supersample in [1, 4] {
                let refined = refine_marker(row, column, supersample);
                let gp = refined.keypoint_general_position();
                let (r, c) = (gp.row, gp.column);
                let error = ((r - row).powi(2) + (c - column).powi(2)).sqrt();
                assert!(error < 0.1, "({row}, {column}) x{supersample}: got ({r:.3}, {c:.3})");
            }
        }
    }

    #[test]
    fn test_flat_scores_keep_the_integer_position() {
        let scanner = CandidateScanner::new(RingLayout::new(4, 9, 2).unwrap(), ScoringParams::default());
        // a power of two keeps every weighted mean exact
        let img = uniform_image(30, 30, 64);
        let view = GrayView::new(&img, 30, 30).unwrap();
        let refined = KeypointRefinement::refine(&scanner, &view, detection(15, 15, 0.0));
        assert_eq!(refined.offset, [0.0, 0.0]);
    }

    #[test]
    fn test_detection_without_room_is_unchanged() {
        let scanner = CandidateScanner::new(RingLayout::new(4, 9, 2).unwrap(), ScoringParams::default());
        let img = uniform_image(30, 30, 90);
        let view = GrayView::new(&img, 30, 30).unwrap();
        let unrefined = detection(3, 15, 50.0);
        assert_eq!(KeypointRefinement::refine(&scanner, &view, unrefined), unrefined);
    }
}
