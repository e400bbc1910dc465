//! Ordinary least squares via the normal equations, solved with Gaussian
//! elimination. Serves as the search baseline.

use crate::model::Matrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    pub fn fit(x: &Matrix, y: &[f64]) -> Self {
        debug_assert_eq!(x.n_rows(), y.len());
        let n = x.n_rows();
        let p = x.n_cols() + 1; // leading intercept column

        // Build X^T X and X^T y with an implicit column of ones.
        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for i in 0..n {
            let row = x.row(i);
            for a in 0..p {
                let va = if a == 0 { 1.0 } else { row[a - 1] };
                xty[a] += va * y[i];
                for b in a..p {
                    let vb = if b == 0 { 1.0 } else { row[b - 1] };
                    xtx[a][b] += va * vb;
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                xtx[a][b] = xtx[b][a];
            }
        }

        let solution = solve(xtx, xty);
        Self {
            intercept: solution[0],
            coefficients: solution[1..].to_vec(),
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.coefficients.len());
        self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(v, c)| v * c)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting. A (near-)zero pivot marks a
/// collinear column; its coefficient is pinned to zero instead of blowing up
/// the solution.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let p = b.len();
    let mut pivot_dropped = vec![false; p];

    for col in 0..p {
        let pivot_row = (col..p)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-10 {
            pivot_dropped[col] = true;
            continue;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in 0..p {
            if row == col {
                continue;
            }
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..p {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    (0..p)
        .map(|col| {
            if pivot_dropped[col] {
                0.0
            } else {
                b[col] / a[col][col]
            }
        })
        .collect()
}
