use crate::detector::MAX_WINDOW_RADIUS;
use crate::error::{BullseyeError, BullseyeResult};

/// Angular sectors per region used for the symmetry term.
pub const SECTOR_COUNT: usize = 16;

/// Samples closer than this to a region boundary are down-weighted
/// linearly, so that boundary blending barely moves the region means.
pub const BOUNDARY_BAND: f64 = 0.5;

/// One weighted pixel of a sampling pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSample {
    pub dr: i32,
    pub dc: i32,
    /// In `(0, 1]`; 1 unless the pixel is within `BOUNDARY_BAND` of a boundary.
    pub weight: f64,
    pub sector: usize,
    region: usize,
}

/// Sampling pattern of a bullseye: the central disk followed by `ring_count`
/// annuli of equal width.
///
/// Region 0 is the disk `d < min_radius`; region `k >= 1` is the annulus
/// `b(k-1) <= d < b(k)` with `b(k) = min_radius + k * width`. Distances are
/// measured from `center`, a sub-pixel position relative to the anchor pixel
/// the `(dr, dc)` offsets are taken from. Samples are stored region after
/// region.
#[derive(Debug, Clone)]
pub struct RingLayout {
    min_radius: usize,
    max_radius: usize,
    ring_count: usize,
    center: [f64; 2],
    samples: Vec<RingSample>,
    bounds: Vec<usize>,
    region_weights: Vec<f64>,
    sector_weights: Vec<[f64; SECTOR_COUNT]>,
}

impl RingLayout {
    pub fn new(min_radius: usize, max_radius: usize, ring_count: usize) -> BullseyeResult<Self> {
        if min_radius == 0 || min_radius >= max_radius || max_radius > MAX_WINDOW_RADIUS {
            return Err(BullseyeError::InvalidRadii { min_radius, max_radius });
        }
        if ring_count == 0 {
            return Err(BullseyeError::InvalidRingCount(ring_count));
        }

        let mut layout = Self {
            min_radius,
            max_radius,
            ring_count,
            center: [0.0, 0.0],
            samples: Vec::new(),
            bounds: Vec::new(),
            region_weights: Vec::new(),
            sector_weights: Vec::new(),
        };
        layout.recenter([0.0, 0.0]);

        for k in 1..layout.region_count() {
            if layout.region_weights[k] <= 0.0 {
                return Err(BullseyeError::EmptyAnnulus {
                    index: k,
                    inner: layout.boundary(k - 1),
                    outer: layout.boundary(k),
                });
            }
        }

        Ok(layout)
    }

    /// Rebuild the samples for a pattern centred at `center` (row, column)
    /// relative to the anchor pixel. Reuses the existing buffers.
    ///
    /// With `|center| <= 0.5` per axis every offset stays within
    /// `max_radius` of the anchor.
    pub fn recenter(&mut self, center: [f64; 2]) {
        self.center = center;
        self.samples.clear();

        let r = self.max_radius as i32;
        for dr in -r..=r {
            for dc in -r..=r {
                let y = dr as f64 - center[0];
                let x = dc as f64 - center[1];
                let Some((region, weight)) = self.region_weight((y * y + x * x).sqrt()) else {
                    continue;
                };
                let angle = y.atan2(x) + std::f64::consts::PI;
                let sector = ((angle / std::f64::consts::TAU * SECTOR_COUNT as f64) as usize) % SECTOR_COUNT;
                self.samples.push(RingSample { dr, dc, weight, sector, region });
            }
        }
        self.samples.sort_unstable_by_key(|s| (s.region, s.dr, s.dc));

        let regions = self.region_count();
        self.bounds.clear();
        self.region_weights.clear();
        self.region_weights.resize(regions, 0.0);
        self.sector_weights.clear();
        self.sector_weights.resize(regions, [0.0; SECTOR_COUNT]);

        let mut next = 0;
        for (i, s) in self.samples.iter().enumerate() {
            while next <= s.region {
                self.bounds.push(i);
                next += 1;
            }
            self.region_weights[s.region] += s.weight;
            self.sector_weights[s.region][s.sector] += s.weight;
        }
        while next <= regions {
            self.bounds.push(self.samples.len());
            next += 1;
        }
    }

    /// Region and sampling weight of a point at distance `d` from the
    /// center, `None` beyond `max_radius` or exactly on a boundary.
    pub fn region_weight(&self, d: f64) -> Option<(usize, f64)> {
        let region = self.region_of(d)?;
        let (distance, half_width) = if region == 0 {
            (self.min_radius as f64 - d, self.min_radius as f64)
        } else {
            let inner = self.boundary(region - 1);
            let outer = self.boundary(region);
            ((d - inner).min(outer - d), (outer - inner) / 2.0)
        };
        let weight = (distance / BOUNDARY_BAND.min(half_width)).min(1.0);
        (weight > 0.0).then_some((region, weight))
    }

    /// Region containing a point at distance `d` from the center.
    pub fn region_of(&self, d: f64) -> Option<usize> {
        let min = self.min_radius as f64;
        if d < min {
            return Some(0);
        }
        if d >= self.max_radius as f64 {
            return None;
        }
        let width = (self.max_radius - self.min_radius) as f64 / self.ring_count as f64;
        let k = ((d - min) / width).floor() as usize;
        Some(1 + k.min(self.ring_count - 1))
    }

    /// Radius `b(k)`; `b(0) = min_radius`, `b(ring_count) = max_radius`.
    pub fn boundary(&self, k: usize) -> f64 {
        let width = (self.max_radius - self.min_radius) as f64 / self.ring_count as f64;
        self.min_radius as f64 + k as f64 * width
    }

    /// Samples of region `k`, or `None` if `k` is not a region index.
    pub fn region(&self, k: usize) -> Option<&[RingSample]> {
        let start = *self.bounds.get(k)?;
        let end = *self.bounds.get(k + 1)?;
        self.samples.get(start..end)
    }

    /// Sum of sample weights in region `k`.
    #[inline]
    pub fn region_weight_total(&self, k: usize) -> f64 {
        self.region_weights[k]
    }

    /// Per-sector weight sums of region `k`.
    #[inline]
    pub fn sector_weights(&self, k: usize) -> &[f64; SECTOR_COUNT] {
        &self.sector_weights[k]
    }

    /// Disk plus annuli.
    #[inline]
    pub fn region_count(&self) -> usize {
        self.ring_count + 1
    }

    #[inline]
    pub fn ring_count(&self) -> usize {
        self.ring_count
    }

    #[inline]
    pub fn min_radius(&self) -> usize {
        self.min_radius
    }

    #[inline]
    pub fn max_radius(&self) -> usize {
        self.max_radius
    }

    #[inline]
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Region start indices into the sample list, `region_count() + 1` long.
    #[inline]
    pub fn bounds(&self) -> &[usize] {
        &self.bounds
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
