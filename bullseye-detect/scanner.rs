use bullseye_core::{GrayView, ScoringParams};
use rayon::prelude::*;

use crate::rings::{RingLayout, SECTOR_COUNT};
use crate::types::ScoreField;

/// Pattern centres, relative to the pixel, tried when scoring a location.
/// Every point of the pixel cell is within a quarter pixel per axis of one.
pub const PHASES: [[f64; 2]; 5] = [
    [0.0, 0.0],
    [-0.25, -0.25],
    [-0.25, 0.25],
    [0.25, -0.25],
    [0.25, 0.25],
];

/// Dense bullseye scoring over every admissible pixel.
///
/// Region means are weighted so that pixels straddling a boundary count
/// little. The contrast is taken over the alternating steps
/// `(-1)^(k-1) * (m_k - m_(k-1))`: polarity follows the sign of their median
/// and, with three or more steps, the single weakest aligned step is ignored.
/// The symmetry penalty is `symmetry_weight` times the pooled standard
/// deviation of the angular sector means.
///
/// A location scores the best of the pattern centred at each of `PHASES`, so
/// a marker centred anywhere in the pixel cell is sampled at most a quarter
/// pixel off. A uniform patch scores zero, a perfect bullseye centred on the
/// pixel scores its ring contrast.
#[derive(Debug, Clone)]
pub struct CandidateScanner {
    phases: Vec<RingLayout>,
    scoring: ScoringParams,
}

impl CandidateScanner {
    pub fn new(layout: RingLayout, scoring: ScoringParams) -> Self {
        let phases = PHASES
            .iter()
            .map(|&center| {
                let mut phase = layout.clone();
                phase.recenter(center);
                phase
            })
            .collect();
        Self { phases, scoring }
    }

    /// Sampling pattern centred on the pixel.
    pub fn layout(&self) -> &RingLayout {
        &self.phases[0]
    }

    pub fn scoring(&self) -> &ScoringParams {
        &self.scoring
    }

    /// Pixels closer than this to any border are never scored.
    #[inline]
    pub fn margin(&self) -> usize {
        self.layout().max_radius()
    }

    /// Whether `(row, column)` can be scored in `image`.
    #[inline]
    pub fn is_admissible(&self, image: &GrayView, row: usize, column: usize) -> bool {
        let m = self.margin();
        row >= m && column >= m && row + m < image.rows() && column + m < image.columns()
    }

    /// Score every admissible pixel, rows in parallel. Locations rejected
    /// early are left at `f64::NEG_INFINITY`.
    pub fn scan(&self, image: &GrayView) -> ScoreField {
        let margin = self.margin();
        let rows = image.rows();
        let columns = image.columns();
        let mut field = ScoreField::unscored(rows, columns, margin);

        if rows < 2 * margin + 1 || columns < 2 * margin + 1 {
            return field;
        }

        field
            .data
            .par_chunks_mut(columns)
            .enumerate()
            .skip(margin)
            .take(rows - 2 * margin)
            .for_each(|(row, out)| {
                let mut steps = Vec::with_capacity(self.layout().ring_count());
                for column in margin..columns - margin {
                    if let Some(score) = self.best_phase(image, row, column, &mut steps, true) {
                        out[column] = score;
                    }
                }
            });

        field
    }

    /// Score with early rejection: `None` when the location cannot exceed
    /// `min_score` or is not admissible.
    pub fn score_at(&self, image: &GrayView, row: usize, column: usize) -> Option<f64> {
        if !self.is_admissible(image, row, column) {
            return None;
        }
        let mut steps = Vec::with_capacity(self.layout().ring_count());
        self.best_phase(image, row, column, &mut steps, true)
    }

    /// Full score without early rejection; `None` only outside the margin.
    pub fn score_exact(&self, image: &GrayView, row: usize, column: usize) -> Option<f64> {
        if !self.is_admissible(image, row, column) {
            return None;
        }
        let mut steps = Vec::with_capacity(self.layout().ring_count());
        self.best_phase(image, row, column, &mut steps, false)
    }

    /// Full score of `layout`, a recentred copy of this scanner's layout,
    /// anchored at `(row, column)`. `steps` is scratch space reused across
    /// calls.
    pub fn score_recentered(
        &self,
        layout: &RingLayout,
        image: &GrayView,
        row: usize,
        column: usize,
        steps: &mut Vec<f64>,
    ) -> Option<f64> {
        if layout.max_radius() != self.margin() || !self.is_admissible(image, row, column) {
            return None;
        }
        self.evaluate(layout, image, row, column, steps, None)
    }

    /// Best score over all phases. With `early_exit`, a phase is abandoned as
    /// soon as it cannot beat both `min_score` and the best phase so far.
    fn best_phase(
        &self,
        image: &GrayView,
        row: usize,
        column: usize,
        steps: &mut Vec<f64>,
        early_exit: bool,
    ) -> Option<f64> {
        let mut best: Option<f64> = None;
        for phase in &self.phases {
            let floor = early_exit.then(|| best.map_or(self.scoring.min_score, |b| b.max(self.scoring.min_score)));
            if let Some(score) = self.evaluate(phase, image, row, column, steps, floor) {
                if best.is_none_or(|b| score > b) {
                    best = Some(score);
                }
            }
        }
        best
    }

    /// Score of `layout` at `(row, column)`. With a `floor`, returns `None`
    /// as soon as the score is known not to exceed it.
    fn evaluate(
        &self,
        layout: &RingLayout,
        image: &GrayView,
        row: usize,
        column: usize,
        steps: &mut Vec<f64>,
        floor: Option<f64>,
    ) -> Option<f64> {
        let pixels = image.as_slice();
        let columns = image.columns() as isize;
        let anchor = (row * image.columns() + column) as isize;
        let at = |dr: i32, dc: i32| pixels[(anchor + dr as isize * columns + dc as isize) as usize] as f64;

        let regions = layout.region_count();

        // Pass 1: weighted means and the contrast they imply.
        steps.clear();
        let mut prev_mean = 0.0;
        for k in 0..regions {
            let total = layout.region_weight_total(k);
            if total <= 0.0 {
                return None;
            }
            let samples = layout.region(k)?;
            let sum: f64 = samples.iter().map(|s| s.weight * at(s.dr, s.dc)).sum();
            let mean = sum / total;
            if k > 0 {
                let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
                steps.push(sign * (mean - prev_mean));
            }
            prev_mean = mean;
        }
        let contrast = aligned_contrast(steps);

        // The penalty is never negative.
        if floor.is_some_and(|f| contrast <= f) {
            return None;
        }

        // Pass 2: angular variance, region by region.
        let weight = self.scoring.symmetry_weight;
        let pooled = regions as f64;
        let mut var_sum = 0.0;
        for k in 0..regions {
            let mut sums = [0.0; SECTOR_COUNT];
            for s in layout.region(k)? {
                sums[s.sector] += s.weight * at(s.dr, s.dc);
            }
            var_sum += sector_variance(&sums, layout.sector_weights(k));

            if floor.is_some_and(|f| contrast - weight * (var_sum / pooled).sqrt() <= f) {
                return None;
            }
        }

        Some(contrast - weight * (var_sum / pooled).sqrt())
    }
}

/// Contrast of alternating steps. Polarity is the sign of their median;
/// with three or more steps the weakest aligned step is dropped and the
/// next weakest is reported. Sorts `steps` in place.
fn aligned_contrast(steps: &mut [f64]) -> f64 {
    let n = steps.len();
    if n == 0 {
        return 0.0;
    }
    steps.sort_unstable_by(|a, b| a.total_cmp(b));
    let median = (steps[(n - 1) / 2] + steps[n / 2]) / 2.0;
    if median >= 0.0 {
        if n >= 3 { steps[1] } else { steps[0] }
    } else if n >= 3 {
        -steps[n - 2]
    } else {
        -steps[n - 1]
    }
}

/// Variance of the non-empty sector means.
#[inline]
fn sector_variance(sums: &[f64; SECTOR_COUNT], weights: &[f64; SECTOR_COUNT]) -> f64 {
    let mut means = [0.0; SECTOR_COUNT];
    let mut n = 0;
    for (s, w) in sums.iter().zip(weights) {
        if *w > 0.0 {
            means[n] = s / w;
            n += 1;
        }
    }
    if n == 0 {
        return 0.0;
    }
    let means = &means[..n];
    let mean = means.iter().sum::<f64>() / n as f64;
    means.iter().map(|m| (m - mean) * (m - mean)).sum::<f64>() / n as f64
}
