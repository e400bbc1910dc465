//! Trainer configuration: column roles, fold count, seed and the
//! per-family hyperparameter grids. An explicit value the trainer receives,
//! never process-wide state; loadable from a TOML file with defaults
//! matching the canonical constants.

use crate::domain::model::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::model::boosting::{BoostLoss, BoostParams};
use crate::model::forest::ForestParams;
use crate::model::search::CandidateSpec;
use crate::model::tree::TreeParams;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_known_columns, validate_non_empty_list, validate_positive_number, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    pub categorical_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub cv_folds: usize,
    pub seed: u64,
    pub decision_tree: TreeGridConfig,
    pub random_forest: ForestGridConfig,
    pub gradient_boosting: BoostingConfig,
    pub linear_baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeGridConfig {
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestGridConfig {
    pub n_trees: usize,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            categorical_columns: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            numeric_columns: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            cv_folds: 5,
            seed: 42,
            decision_tree: TreeGridConfig::default(),
            random_forest: ForestGridConfig::default(),
            gradient_boosting: BoostingConfig::default(),
            linear_baseline: true,
        }
    }
}

impl Default for TreeGridConfig {
    fn default() -> Self {
        Self {
            max_depth: vec![1, 2, 3],
            min_samples_split: vec![2, 3],
        }
    }
}

impl Default for ForestGridConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: vec![1, 2, 3],
            min_samples_split: vec![2, 3],
        }
    }
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
        }
    }
}

impl TrainerConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand the grids into the flat candidate menu, in search order:
    /// decision trees, forests, the two boosted variants, then the linear
    /// baseline.
    pub fn candidates(&self) -> Vec<CandidateSpec> {
        let mut candidates = Vec::new();

        for &max_depth in &self.decision_tree.max_depth {
            for &min_samples_split in &self.decision_tree.min_samples_split {
                candidates.push(CandidateSpec::DecisionTree(TreeParams {
                    max_depth,
                    min_samples_split,
                }));
            }
        }

        for &max_depth in &self.random_forest.max_depth {
            for &min_samples_split in &self.random_forest.min_samples_split {
                candidates.push(CandidateSpec::RandomForest(ForestParams {
                    n_trees: self.random_forest.n_trees,
                    max_depth,
                    min_samples_split,
                }));
            }
        }

        for loss in [BoostLoss::SquaredError, BoostLoss::AbsoluteError] {
            candidates.push(CandidateSpec::GradientBoosting(BoostParams {
                loss,
                n_rounds: self.gradient_boosting.n_rounds,
                learning_rate: self.gradient_boosting.learning_rate,
                max_depth: self.gradient_boosting.max_depth,
                min_samples_split: self.gradient_boosting.min_samples_split,
            }));
        }

        if self.linear_baseline {
            candidates.push(CandidateSpec::Linear);
        }

        candidates
    }
}

impl Validate for TrainerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_list("categorical_columns", &self.categorical_columns)?;
        validate_non_empty_list("numeric_columns", &self.numeric_columns)?;
        validate_known_columns(
            "categorical_columns",
            &self.categorical_columns,
            &CATEGORICAL_COLUMNS,
        )?;
        validate_known_columns("numeric_columns", &self.numeric_columns, &NUMERIC_COLUMNS)?;

        validate_positive_number("cv_folds", self.cv_folds, 2)?;
        validate_non_empty_list("decision_tree.max_depth", &self.decision_tree.max_depth)?;
        validate_non_empty_list(
            "decision_tree.min_samples_split",
            &self.decision_tree.min_samples_split,
        )?;
        validate_non_empty_list("random_forest.max_depth", &self.random_forest.max_depth)?;
        validate_non_empty_list(
            "random_forest.min_samples_split",
            &self.random_forest.min_samples_split,
        )?;
        validate_positive_number("random_forest.n_trees", self.random_forest.n_trees, 1)?;
        validate_positive_number(
            "gradient_boosting.n_rounds",
            self.gradient_boosting.n_rounds,
            1,
        )?;

        if !(self.gradient_boosting.learning_rate > 0.0) {
            return Err(PipelineError::config(
                "gradient_boosting.learning_rate",
                "must be positive",
            ));
        }
        if self
            .decision_tree
            .min_samples_split
            .iter()
            .chain(&self.random_forest.min_samples_split)
            .any(|&m| m < 2)
        {
            return Err(PipelineError::config(
                "min_samples_split",
                "must be at least 2",
            ));
        }

        Ok(())
    }
}
