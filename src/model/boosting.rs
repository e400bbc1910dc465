//! Gradient-boosted regression trees. Two loss variants fill the two
//! boosted slots of the candidate menu: squared error (residual fitting)
//! and absolute error (sign residuals with median leaf updates).

use crate::model::tree::{normalize_gains, DecisionTree, TreeParams};
use crate::model::Matrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostLoss {
    SquaredError,
    AbsoluteError,
}

impl BoostLoss {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SquaredError => "squared_error",
            Self::AbsoluteError => "absolute_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub loss: BoostLoss,
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    loss: BoostLoss,
    base_prediction: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &Matrix, y: &[f64], params: &BoostParams) -> Self {
        debug_assert!(!y.is_empty());
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
        };

        let base_prediction = match params.loss {
            BoostLoss::SquaredError => y.iter().sum::<f64>() / y.len() as f64,
            BoostLoss::AbsoluteError => median(y),
        };

        let mut current: Vec<f64> = vec![base_prediction; y.len()];
        let mut trees = Vec::with_capacity(params.n_rounds);

        for _ in 0..params.n_rounds {
            let residuals: Vec<f64> = match params.loss {
                BoostLoss::SquaredError => {
                    y.iter().zip(&current).map(|(t, f)| t - f).collect()
                }
                BoostLoss::AbsoluteError => y
                    .iter()
                    .zip(&current)
                    .map(|(t, f)| match (t - f).partial_cmp(&0.0) {
                        Some(std::cmp::Ordering::Greater) => 1.0,
                        Some(std::cmp::Ordering::Less) => -1.0,
                        _ => 0.0,
                    })
                    .collect(),
            };

            let mut tree = DecisionTree::fit(x, &residuals, &tree_params);

            if params.loss == BoostLoss::AbsoluteError {
                refit_leaves_to_median(&mut tree, x, y, &current);
            }

            for (i, value) in current.iter_mut().enumerate() {
                *value += params.learning_rate * tree.predict_row(x.row(i));
            }
            trees.push(tree);
        }

        Self {
            loss: params.loss,
            base_prediction,
            learning_rate: params.learning_rate,
            trees,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let boosted: f64 = self
            .trees
            .iter()
            .map(|tree| self.learning_rate * tree.predict_row(row))
            .sum();
        self.base_prediction + boosted
    }

    pub fn loss(&self) -> BoostLoss {
        self.loss
    }

    /// Total raw gain across all rounds, normalized.
    pub fn feature_importances(&self) -> Vec<f64> {
        let n_features = self
            .trees
            .first()
            .map_or(0, |tree| tree.importance_gains().len());
        let mut sums = vec![0.0; n_features];
        for tree in &self.trees {
            for (slot, gain) in sums.iter_mut().zip(tree.importance_gains()) {
                *slot += gain;
            }
        }
        normalize_gains(&sums)
    }
}

/// The absolute-error leaf update: each leaf predicts the median of the
/// current residuals of the rows routed to it.
fn refit_leaves_to_median(tree: &mut DecisionTree, x: &Matrix, y: &[f64], current: &[f64]) {
    let n_leaves = tree.n_leaves();
    let mut residuals_per_leaf: Vec<Vec<f64>> = vec![Vec::new(); n_leaves];
    for i in 0..x.n_rows() {
        let leaf = tree.apply(x.row(i));
        residuals_per_leaf[leaf].push(y[i] - current[i]);
    }

    for (leaf_value, residuals) in tree.leaf_values_mut().into_iter().zip(&residuals_per_leaf) {
        if !residuals.is_empty() {
            *leaf_value = median(residuals);
        }
    }
}

fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_data() -> (Matrix, Vec<f64>) {
        let x = Matrix::from_rows((0..30).map(|i| vec![i as f64]).collect());
        let y = (0..30).map(|i| 2.0 * i as f64 + 5.0).collect();
        (x, y)
    }

    #[test]
    fn squared_loss_fits_a_ramp() {
        let (x, y) = ramp_data();
        let params = BoostParams {
            loss: BoostLoss::SquaredError,
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
        };
        let model = GradientBoosting::fit(&x, &y, &params);

        // In-sample fit should be close after 100 rounds.
        let prediction = model.predict_row(&[10.0]);
        assert!((prediction - 25.0).abs() < 2.0, "got {prediction}");
    }

    #[test]
    fn absolute_loss_resists_a_single_outlier() {
        let x = Matrix::from_rows((0..21).map(|i| vec![i as f64]).collect());
        let mut y: Vec<f64> = vec![10.0; 21];
        y[20] = 10_000.0;

        let params = BoostParams {
            loss: BoostLoss::AbsoluteError,
            n_rounds: 20,
            learning_rate: 0.1,
            max_depth: 2,
            min_samples_split: 2,
        };
        let model = GradientBoosting::fit(&x, &y, &params);

        // The median-based model should stay near the bulk of the data.
        let prediction = model.predict_row(&[5.0]);
        assert!((prediction - 10.0).abs() < 5.0, "got {prediction}");
    }

    #[test]
    fn median_of_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
