use rayon::prelude::*;

use crate::types::{ScoreField, ScoreSample};

/// Threshold plus non-maximum suppression over a complete score field.
///
/// A location survives when its score exceeds `min_score` and it beats every
/// scored location within `radius` (Euclidean). Equal scores go to the
/// lexicographically smaller `(row, column)`, so the outcome does not depend
/// on scan order.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    radius: usize,
    min_score: f64,
    /// Half-width of the disk window on each row offset `-radius..=radius`.
    spans: Vec<i64>,
}

impl NonMaxSuppression {
    pub fn new(radius: usize, min_score: f64) -> Self {
        let r = radius as i64;
        let spans = (-r..=r).map(|dr| isqrt(r * r - dr * dr)).collect();
        Self {
            radius,
            min_score,
            spans,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Surviving locations in `(row, column)` order.
    pub fn suppress(&self, field: &ScoreField) -> Vec<ScoreSample> {
        let margin = field.margin;
        if field.rows < 2 * margin + 1 || field.columns < 2 * margin + 1 {
            return Vec::new();
        }

        (margin..field.rows - margin)
            .into_par_iter()
            .flat_map_iter(|row| {
                let mut kept = Vec::new();
                for column in margin..field.columns - margin {
                    let score = field.at(row, column);
                    if score > self.min_score && self.is_local_max(field, row, column, score) {
                        kept.push(ScoreSample { row, column, score });
                    }
                }
                kept
            })
            .collect()
    }

    fn is_local_max(&self, field: &ScoreField, row: usize, column: usize, score: f64) -> bool {
        let rows = field.rows as i64;
        let columns = field.columns as i64;

        let radius = self.radius as i64;
        for (i, &span) in self.spans.iter().enumerate() {
            let dr = i as i64 - radius;
            let r = row as i64 + dr;
            if r < 0 || r >= rows {
                continue;
            }
            for dc in -span..=span {
                let c = column as i64 + dc;
                if (dr == 0 && dc == 0) || c < 0 || c >= columns {
                    continue;
                }
                let other = field.at(r as usize, c as usize);
                if other > score {
                    return false;
                }
                // tie: earlier location in row-major order wins
                if other == score && (dr < 0 || (dr == 0 && dc < 0)) {
                    return false;
                }
            }
        }
        true
    }
}

/// Largest `s` with `s * s <= n`.
fn isqrt(n: i64) -> i64 {
    let mut s = (n as f64).sqrt() as i64;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(rows: usize, columns: usize, margin: usize, peaks: &[(usize, usize, f64)]) -> ScoreField {
        let mut field = ScoreField::unscored(rows, columns, margin);
        for &(r, c, v) in peaks {
            field.data[r * columns + c] = v;
        }
        field
    }

    #[test]
    fn test_empty_field() {
        let field = field_with(30, 30, 5, &[]);
        let nms = NonMaxSuppression::new(5, 1.0);
        assert!(nms.suppress(&field).is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let field = field_with(30, 30, 5, &[(10, 10, 1.0), (20, 20, 1.5)]);
        let nms = NonMaxSuppression::new(3, 1.0);
        let kept = nms.suppress(&field);
        assert_eq!(kept, vec![ScoreSample { row: 20, column: 20, score: 1.5 }]);
    }

    #[test]
    fn test_close_peaks_collapse_to_strongest() {
        let field = field_with(40, 40, 5, &[(15, 15, 10.0), (18, 19, 12.0), (16, 14, 11.0)]);
        let nms = NonMaxSuppression::new(6, 1.0);
        let kept = nms.suppress(&field);
        assert_eq!(kept.len(), 1);
        assert_eq!((kept[0].row, kept[0].column), (18, 19));
    }

    #[test]
    fn test_separated_peaks_both_survive() {
        let field = field_with(40, 40, 5, &[(10, 10, 10.0), (10, 17, 9.0)]);
        let nms = NonMaxSuppression::new(6, 1.0);
        let kept = nms.suppress(&field);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].row, kept[0].column), (10, 10));
        assert_eq!((kept[1].row, kept[1].column), (10, 17));
    }

    #[test]
    fn test_tie_goes_to_smallest_location() {
        let field = field_with(40, 40, 5, &[(20, 22, 7.0), (20, 20, 7.0), (21, 10, 7.0), (19, 21, 7.0)]);
        let nms = NonMaxSuppression::new(3, 1.0);
        let kept = nms.suppress(&field);
        let locations: Vec<_> = kept.iter().map(|s| (s.row, s.column)).collect();
        assert_eq!(locations, vec![(19, 21), (21, 10)]);
    }

    #[test]
    fn test_window_is_a_euclidean_disk() {
        let nms = NonMaxSuppression::new(5, 1.0);
        assert_eq!(nms.spans, vec![0, 3, 4, 4, 4, 5, 4, 4, 4, 3, 0]);
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
    }

    #[test]
    fn test_wide_window_stays_small() {
        let nms = NonMaxSuppression::new(1024, 1.0);
        assert_eq!(nms.spans.len(), 2049);
        assert_eq!(nms.spans[1024], 1024);

        // (10, 10) and (10, 30) see each other; only the stronger survives
        let field = field_with(40, 40, 5, &[(10, 10, 3.0), (10, 30, 4.0)]);
        let kept = nms.suppress(&field);
        assert_eq!(kept, vec![ScoreSample { row: 10, column: 30, score: 4.0 }]);
    }

    #[test]
    fn test_margin_locations_are_ignored() {
        let field = field_with(30, 30, 5, &[(2, 15, 100.0), (15, 27, 100.0)]);
        let nms = NonMaxSuppression::new(3, 1.0);
        assert!(nms.suppress(&field).is_empty());
    }
}
