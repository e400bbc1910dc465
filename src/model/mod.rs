// Model layer: preprocessing, candidate estimators, cross-validated grid
// search and the persisted pipeline artifact.

pub mod artifact;
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod preprocess;
pub mod search;
pub mod tree;

pub use artifact::PriceModel;
pub use preprocess::Preprocessor;
pub use search::{grid_search, CandidateSpec, FittedEstimator, SearchOutcome, TrialRecord};

/// Dense row-major matrix of encoded feature values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == n_cols));

        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            data.extend(row);
        }

        Self {
            rows: n_rows,
            cols: n_cols,
            data,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }
}
