//! CART regression tree: exhaustive variance-reduction splits with depth and
//! minimum-split-size limits. Building block for the forest and boosting
//! estimators.

use crate::model::Matrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
    /// Raw sum-of-squared-error reduction attributed to each input feature.
    /// Consumers normalize; keeping raw gains lets ensembles weight trees.
    importance_gains: Vec<f64>,
}

impl DecisionTree {
    pub fn fit(x: &Matrix, y: &[f64], params: &TreeParams) -> Self {
        let indices: Vec<usize> = (0..x.n_rows()).collect();
        Self::fit_with_indices(x, y, &indices, params)
    }

    /// Fit on a subset of rows (duplicates allowed), which is how bootstrap
    /// samples are expressed.
    pub fn fit_with_indices(x: &Matrix, y: &[f64], indices: &[usize], params: &TreeParams) -> Self {
        debug_assert_eq!(x.n_rows(), y.len());
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            importance_gains: vec![0.0; x.n_cols()],
        };
        let root = builder.build(indices.to_vec(), 0);
        Self {
            root,
            importance_gains: builder.importance_gains,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Index of the leaf `row` lands in, counted depth-first with left
    /// children first. Stable across [`Self::leaf_values_mut`].
    pub fn apply(&self, row: &[f64]) -> usize {
        fn descend(node: &Node, row: &[f64], next_id: &mut usize) -> Option<usize> {
            match node {
                Node::Leaf { .. } => {
                    let id = *next_id;
                    *next_id += 1;
                    Some(id)
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if row[*feature] <= *threshold {
                        descend(left, row, next_id)
                    } else {
                        *next_id += count_leaves(left);
                        descend(right, row, next_id)
                    }
                }
            }
        }
        let mut next_id = 0;
        descend(&self.root, row, &mut next_id).expect("tree has at least one leaf")
    }

    /// Mutable references to all leaf values, in [`Self::apply`] order.
    pub fn leaf_values_mut(&mut self) -> Vec<&mut f64> {
        fn collect<'a>(node: &'a mut Node, leaves: &mut Vec<&'a mut f64>) {
            match node {
                Node::Leaf { value } => leaves.push(value),
                Node::Split { left, right, .. } => {
                    collect(left, leaves);
                    collect(right, leaves);
                }
            }
        }
        let mut leaves = Vec::new();
        collect(&mut self.root, &mut leaves);
        leaves
    }

    pub fn n_leaves(&self) -> usize {
        count_leaves(&self.root)
    }

    pub fn importance_gains(&self) -> &[f64] {
        &self.importance_gains
    }

    /// Per-feature importance normalized to sum to one (all zeros for a
    /// stump that never split).
    pub fn feature_importances(&self) -> Vec<f64> {
        normalize_gains(&self.importance_gains)
    }
}

pub(crate) fn normalize_gains(gains: &[f64]) -> Vec<f64> {
    let total: f64 = gains.iter().sum();
    if total > 0.0 {
        gains.iter().map(|g| g / total).collect()
    } else {
        vec![0.0; gains.len()]
    }
}

fn count_leaves(node: &Node) -> usize {
    match node {
        Node::Leaf { .. } => 1,
        Node::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

struct TreeBuilder<'a> {
    x: &'a Matrix,
    y: &'a [f64],
    params: &'a TreeParams,
    importance_gains: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> Node {
        let n = indices.len();
        let (sum, sq_sum) = indices
            .iter()
            .fold((0.0, 0.0), |(s, q), &i| (s + self.y[i], q + self.y[i] * self.y[i]));
        let mean = sum / n as f64;
        let sse = (sq_sum - sum * sum / n as f64).max(0.0);

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split
            || sse <= f64::EPSILON
        {
            return Node::Leaf { value: mean };
        }

        let Some(best) = self.find_best_split(&indices, sse) else {
            return Node::Leaf { value: mean };
        };

        self.importance_gains[best.feature] += best.gain;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x.get(i, best.feature) <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(left_indices, depth + 1)),
            right: Box::new(self.build(right_indices, depth + 1)),
        }
    }

    fn find_best_split(&self, indices: &[usize], parent_sse: f64) -> Option<BestSplit> {
        let n = indices.len();
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.x.n_cols() {
            let mut sorted: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.x.get(i, feature), self.y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let total_sum: f64 = sorted.iter().map(|(_, y)| y).sum();
            let total_sq: f64 = sorted.iter().map(|(_, y)| y * y).sum();

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for split_at in 1..n {
                let (value, target) = sorted[split_at - 1];
                left_sum += target;
                left_sq += target * target;

                let next_value = sorted[split_at].0;
                if next_value <= value {
                    continue; // tie, not a valid threshold
                }

                let n_left = split_at as f64;
                let n_right = (n - split_at) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;

                let sse_left = (left_sq - left_sum * left_sum / n_left).max(0.0);
                let sse_right = (right_sq - right_sum * right_sum / n_right).max(0.0);
                let gain = parent_sse - sse_left - sse_right;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
