use bullseye_core::Keypoint;

/// Transient `(row, column, score)` triple produced while suppressing the
/// score field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSample {
    pub row: usize,
    pub column: usize,
    pub score: f64,
}

/// Dense row-major score map. Locations that were never scored (outside the
/// margin) or were rejected early hold `f64::NEG_INFINITY`.
#[derive(Debug, Clone)]
pub struct ScoreField {
    pub rows: usize,
    pub columns: usize,
    pub margin: usize,
    pub data: Vec<f64>,
}

impl ScoreField {
    pub(crate) fn unscored(rows: usize, columns: usize, margin: usize) -> Self {
        Self {
            rows,
            columns,
            margin,
            data: vec![f64::NEG_INFINITY; rows * columns],
        }
    }

    /// Raw value at an integer location.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f64 {
        self.data[row * self.columns + column]
    }

    /// Score at a location, `None` when unscored or rejected.
    #[inline]
    pub fn score(&self, row: usize, column: usize) -> Option<f64> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        let v = self.at(row, column);
        v.is_finite().then_some(v)
    }

    /// Whether `(row, column)` lies inside the scanned margin.
    #[inline]
    pub fn is_admissible(&self, row: usize, column: usize) -> bool {
        row >= self.margin
            && column >= self.margin
            && row + self.margin < self.rows
            && column + self.margin < self.columns
    }

    /// Number of locations carrying a finite score.
    pub fn scored_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_finite()).count()
    }
}

/// One detected marker: integer anchor plus the sub-pixel offset found by
/// refinement. Both output forms are views of this record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub row: usize,
    pub column: usize,
    /// `(row, column)` offset, each component in `[-0.5, 0.5]`.
    pub offset: [f64; 2],
    pub score: f64,
}

impl Detection {
    pub fn keypoint(&self) -> Keypoint<usize> {
        Keypoint::new(self.row, self.column)
    }

    pub fn keypoint_general_position(&self) -> Keypoint<f64> {
        Keypoint::new(
            self.row as f64 + self.offset[0],
            self.column as f64 + self.offset[1],
        )
    }
}

/// Integer keypoint with its bullseye score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredKeypoint {
    pub keypoint: Keypoint<usize>,
    pub score: f64,
}
