//! Cross-validated grid search over the candidate estimator menu. Scoring
//! is negated root-mean-squared error so that higher is uniformly better;
//! independent (candidate, fold) fits run on the rayon pool.

use crate::domain::model::ListingFeatures;
use crate::model::boosting::{BoostParams, GradientBoosting};
use crate::model::forest::{ForestParams, RandomForest};
use crate::model::linear::LinearRegression;
use crate::model::metrics::root_mean_squared_error;
use crate::model::preprocess::Preprocessor;
use crate::model::tree::{DecisionTree, TreeParams};
use crate::model::Matrix;
use crate::utils::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateSpec {
    DecisionTree(TreeParams),
    RandomForest(ForestParams),
    GradientBoosting(BoostParams),
    Linear,
}

impl CandidateSpec {
    pub fn family(&self) -> &'static str {
        match self {
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
            Self::GradientBoosting(_) => "gradient_boosting",
            Self::Linear => "linear_regression",
        }
    }

    /// Flat string map of the candidate's parameters, for trial records and
    /// experiment tracking.
    pub fn describe(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("model".to_string(), self.family().to_string());
        match self {
            Self::DecisionTree(p) => {
                params.insert("max_depth".to_string(), p.max_depth.to_string());
                params.insert(
                    "min_samples_split".to_string(),
                    p.min_samples_split.to_string(),
                );
            }
            Self::RandomForest(p) => {
                params.insert("n_trees".to_string(), p.n_trees.to_string());
                params.insert("max_depth".to_string(), p.max_depth.to_string());
                params.insert(
                    "min_samples_split".to_string(),
                    p.min_samples_split.to_string(),
                );
            }
            Self::GradientBoosting(p) => {
                params.insert("loss".to_string(), p.loss.as_str().to_string());
                params.insert("n_rounds".to_string(), p.n_rounds.to_string());
                params.insert("learning_rate".to_string(), p.learning_rate.to_string());
                params.insert("max_depth".to_string(), p.max_depth.to_string());
            }
            Self::Linear => {}
        }
        params
    }

    pub fn fit(&self, x: &Matrix, y: &[f64], seed: u64) -> FittedEstimator {
        match self {
            Self::DecisionTree(p) => FittedEstimator::DecisionTree(DecisionTree::fit(x, y, p)),
            Self::RandomForest(p) => {
                FittedEstimator::RandomForest(RandomForest::fit(x, y, p, seed))
            }
            Self::GradientBoosting(p) => {
                FittedEstimator::GradientBoosting(GradientBoosting::fit(x, y, p))
            }
            Self::Linear => FittedEstimator::Linear(LinearRegression::fit(x, y)),
        }
    }
}

/// A fitted estimator of any candidate family, serialized inside the model
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum FittedEstimator {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Linear(LinearRegression),
}

impl FittedEstimator {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::DecisionTree(m) => m.predict_row(row),
            Self::RandomForest(m) => m.predict_row(row),
            Self::GradientBoosting(m) => m.predict_row(row),
            Self::Linear(m) => m.predict_row(row),
        }
    }

    /// Impurity-based importances for the tree families; `None` for the
    /// linear baseline.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Self::DecisionTree(m) => Some(m.feature_importances()),
            Self::RandomForest(m) => Some(m.feature_importances()),
            Self::GradientBoosting(m) => Some(m.feature_importances()),
            Self::Linear(_) => None,
        }
    }
}

/// Parameters and per-fold scores of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub params: BTreeMap<String, String>,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: CandidateSpec,
    pub best_score: f64,
    pub trials: Vec<TrialRecord>,
}

struct FoldData {
    x_train: Matrix,
    y_train: Vec<f64>,
    x_val: Matrix,
    y_val: Vec<f64>,
}

/// Run the grid search. Fold assignment is a seeded shuffle, so the same
/// seed and input reproduce the same folds. Any candidate that cannot be
/// scored fails the whole search; no best-effort winner is produced.
pub fn grid_search(
    rows: &[ListingFeatures],
    targets: &[f64],
    categorical_columns: &[String],
    numeric_columns: &[String],
    candidates: &[CandidateSpec],
    folds: usize,
    seed: u64,
) -> Result<SearchOutcome> {
    if rows.len() != targets.len() {
        return Err(PipelineError::schema(format!(
            "feature rows ({}) and targets ({}) differ in length",
            rows.len(),
            targets.len()
        )));
    }
    if candidates.is_empty() {
        return Err(PipelineError::search("empty candidate menu"));
    }
    if folds < 2 {
        return Err(PipelineError::config("cv_folds", "must be at least 2"));
    }
    if rows.len() < folds {
        return Err(PipelineError::search(format!(
            "{} training rows cannot be split into {} folds",
            rows.len(),
            folds
        )));
    }

    let fold_data = prepare_folds(rows, targets, categorical_columns, numeric_columns, folds, seed)?;

    // Every (candidate, fold) combination is an independent, stateless fit.
    let jobs: Vec<(usize, usize)> = (0..candidates.len())
        .flat_map(|c| (0..folds).map(move |f| (c, f)))
        .collect();

    let scored: Vec<(usize, usize, f64)> = jobs
        .into_par_iter()
        .map(|(candidate_index, fold_index)| {
            let fold = &fold_data[fold_index];
            let model = candidates[candidate_index].fit(&fold.x_train, &fold.y_train, seed);
            let predictions: Vec<f64> = (0..fold.x_val.n_rows())
                .map(|i| model.predict_row(fold.x_val.row(i)))
                .collect();
            let score = -root_mean_squared_error(&fold.y_val, &predictions);
            (candidate_index, fold_index, score)
        })
        .collect();

    let mut fold_scores = vec![vec![f64::NAN; folds]; candidates.len()];
    for (candidate_index, fold_index, score) in scored {
        fold_scores[candidate_index][fold_index] = score;
    }

    let mut trials = Vec::with_capacity(candidates.len());
    let mut best: Option<(usize, f64)> = None;
    for (candidate_index, scores) in fold_scores.into_iter().enumerate() {
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(PipelineError::search(format!(
                "cross-validation produced a non-finite score for candidate {}",
                candidates[candidate_index].family()
            )));
        }
        let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;
        trials.push(TrialRecord {
            params: candidates[candidate_index].describe(),
            fold_scores: scores,
            mean_score,
        });
        // Strictly-greater comparison keeps the first best on ties.
        if best.map_or(true, |(_, s)| mean_score > s) {
            best = Some((candidate_index, mean_score));
        }
    }

    let (best_index, best_score) = best.expect("candidate menu is non-empty");
    Ok(SearchOutcome {
        best: candidates[best_index].clone(),
        best_score,
        trials,
    })
}

/// Assign rows to folds and precompute the per-fold preprocessed matrices.
/// The preprocessor is fitted on each fold's training split only, exactly as
/// the final pipeline is fitted on the full training set.
fn prepare_folds(
    rows: &[ListingFeatures],
    targets: &[f64],
    categorical_columns: &[String],
    numeric_columns: &[String],
    folds: usize,
    seed: u64,
) -> Result<Vec<FoldData>> {
    let mut shuffled: Vec<usize> = (0..rows.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let mut assignment = vec![0usize; rows.len()];
    for (position, &row_index) in shuffled.iter().enumerate() {
        assignment[row_index] = position % folds;
    }

    (0..folds)
        .map(|fold| {
            let mut train_rows = Vec::new();
            let mut y_train = Vec::new();
            let mut val_rows = Vec::new();
            let mut y_val = Vec::new();
            for (i, row) in rows.iter().enumerate() {
                if assignment[i] == fold {
                    val_rows.push(row.clone());
                    y_val.push(targets[i]);
                } else {
                    train_rows.push(row.clone());
                    y_train.push(targets[i]);
                }
            }

            let preprocessor =
                Preprocessor::fit(categorical_columns, numeric_columns, &train_rows)?;
            Ok(FoldData {
                x_train: preprocessor.transform(&train_rows),
                y_train,
                x_val: preprocessor.transform(&val_rows),
                y_val,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BY_CAR, ON_FOOT};

    fn synthetic_rows(n: usize) -> (Vec<ListingFeatures>, Vec<f64>) {
        let mut rows = Vec::with_capacity(n);
        let mut targets = Vec::with_capacity(n);
        for i in 0..n {
            let area = 20.0 + (i % 13) as f64 * 5.0;
            let rooms = match i % 3 {
                0 => "Студия",
                1 => "1-комнатная",
                _ => "2-комнатная",
            };
            rows.push(ListingFeatures {
                flat_status: i % 2 == 0,
                num_of_rooms: rooms.to_string(),
                total_area_m2: area,
                living_area_m2: area * 0.6,
                kitchen_area_m2: area * 0.2,
                floor: (i % 9 + 1) as u32,
                metro_station: if i % 2 == 0 { "Озерки" } else { "Девяткино" }.to_string(),
                minutes_to_metro: (i % 15 + 1) as u32,
                transfer_type: if i % 4 == 0 { BY_CAR } else { ON_FOOT }.to_string(),
                house_age: (i % 40) as u32,
                is_future_building: i % 10 == 0,
            });
            targets.push(100_000.0 * area + 50_000.0 * (i % 3) as f64);
        }
        (rows, targets)
    }

    fn column_config() -> (Vec<String>, Vec<String>) {
        let cats = crate::domain::model::CATEGORICAL_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        let nums = crate::domain::model::NUMERIC_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        (cats, nums)
    }

    #[test]
    fn search_records_one_trial_per_candidate_and_picks_the_best_mean() {
        let (rows, targets) = synthetic_rows(40);
        let (cats, nums) = column_config();
        let candidates = vec![
            CandidateSpec::DecisionTree(TreeParams {
                max_depth: 1,
                min_samples_split: 2,
            }),
            CandidateSpec::Linear,
        ];

        let outcome =
            grid_search(&rows, &targets, &cats, &nums, &candidates, 5, 42).unwrap();

        assert_eq!(outcome.trials.len(), 2);
        assert!(outcome.trials.iter().all(|t| t.fold_scores.len() == 5));
        let best_mean = outcome
            .trials
            .iter()
            .map(|t| t.mean_score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(outcome.best_score, best_mean);
        // The target is essentially linear in area, so the baseline should
        // beat a depth-1 stump.
        assert_eq!(outcome.best, CandidateSpec::Linear);
    }

    #[test]
    fn search_is_deterministic_for_a_seed() {
        let (rows, targets) = synthetic_rows(25);
        let (cats, nums) = column_config();
        let candidates = vec![CandidateSpec::RandomForest(ForestParams {
            n_trees: 5,
            max_depth: 2,
            min_samples_split: 2,
        })];

        let a = grid_search(&rows, &targets, &cats, &nums, &candidates, 5, 7).unwrap();
        let b = grid_search(&rows, &targets, &cats, &nums, &candidates, 5, 7).unwrap();
        assert_eq!(a.trials, b.trials);
    }

    #[test]
    fn too_few_rows_for_the_fold_count_is_a_search_error() {
        let (rows, targets) = synthetic_rows(3);
        let (cats, nums) = column_config();
        let candidates = vec![CandidateSpec::Linear];
        let result = grid_search(&rows, &targets, &cats, &nums, &candidates, 5, 42);
        assert!(result.is_err());
    }
}
