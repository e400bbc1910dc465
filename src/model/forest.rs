//! Random forest regressor: bagged CART trees trained in parallel on a
//! rayon pool, predictions averaged.

use crate::model::tree::{normalize_gains, DecisionTree, TreeParams};
use crate::model::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Each tree gets a bootstrap sample drawn from an rng seeded with
    /// `seed + tree_index`, so a fit is reproducible regardless of how rayon
    /// schedules the trees.
    pub fn fit(x: &Matrix, y: &[f64], params: &ForestParams, seed: u64) -> Self {
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
        };
        let n = x.n_rows();

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree_index as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit_with_indices(x, y, &indices, &tree_params)
            })
            .collect();

        Self { trees }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|tree| tree.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Mean of the per-tree normalized importances.
    pub fn feature_importances(&self) -> Vec<f64> {
        let n_features = self
            .trees
            .first()
            .map_or(0, |tree| tree.importance_gains().len());
        let mut sums = vec![0.0; n_features];
        for tree in &self.trees {
            for (slot, value) in sums.iter_mut().zip(tree.feature_importances()) {
                *slot += value;
            }
        }
        normalize_gains(&sums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Matrix, Vec<f64>) {
        let x = Matrix::from_rows((0..20).map(|i| vec![i as f64]).collect());
        let y = (0..20).map(|i| if i < 10 { 1.0 } else { 9.0 }).collect();
        (x, y)
    }

    #[test]
    fn forest_learns_a_step_function() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_trees: 25,
            max_depth: 3,
            min_samples_split: 2,
        };
        let forest = RandomForest::fit(&x, &y, &params, 42);

        assert!(forest.predict_row(&[1.0]) < 4.0);
        assert!(forest.predict_row(&[18.0]) > 6.0);
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_trees: 10,
            max_depth: 2,
            min_samples_split: 2,
        };
        let a = RandomForest::fit(&x, &y, &params, 42);
        let b = RandomForest::fit(&x, &y, &params, 42);
        assert_eq!(a, b);
    }
}
