//! Training stage: cross-validated grid search over the candidate menu,
//! refit of the winner on the full training set, atomic persistence of the
//! model artifact, and an optional metrics report for the test table.

use crate::config::trainer::TrainerConfig;
use crate::domain::model::{FeaturedListing, MetricsReport};
use crate::domain::ports::ExperimentTracker;
use crate::model::preprocess::Preprocessor;
use crate::model::search::grid_search;
use crate::model::PriceModel;
use crate::pipeline::evaluate::evaluate_model;
use crate::utils::error::Result;
use crate::utils::io;
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub winning_params: BTreeMap<String, String>,
    pub cv_score: f64,
    pub test_metrics: MetricsReport,
}

pub fn run(
    train_input: &Path,
    test_input: &Path,
    model_output: &Path,
    metrics_output: Option<&Path>,
    config: &TrainerConfig,
    tracker: &dyn ExperimentTracker,
    monitor: &SystemMonitor,
) -> Result<TrainSummary> {
    config.validate()?;

    let train_rows: Vec<FeaturedListing> = io::read_csv(train_input)?;
    let features: Vec<_> = train_rows.iter().map(FeaturedListing::features).collect();
    let targets: Vec<f64> = train_rows.iter().map(|r| r.price).collect();

    let candidates = config.candidates();
    tracing::info!(
        rows = train_rows.len(),
        candidates = candidates.len(),
        folds = config.cv_folds,
        "Starting model search"
    );
    monitor.log_stats("search start");

    let outcome = grid_search(
        &features,
        &targets,
        &config.categorical_columns,
        &config.numeric_columns,
        &candidates,
        config.cv_folds,
        config.seed,
    )?;

    monitor.log_stats("search done");
    for trial in &outcome.trials {
        tracing::info!(
            model = %trial.params["model"],
            mean_score = trial.mean_score,
            params = ?trial.params,
            "Trial scored"
        );
    }

    let winning_params = outcome.best.describe();
    tracing::info!(
        model = %winning_params["model"],
        cv_score = outcome.best_score,
        "Best candidate selected"
    );
    tracker.record_params(&winning_params);

    // Refit the winning pipeline on the full training set.
    let preprocessor = Preprocessor::fit(
        &config.categorical_columns,
        &config.numeric_columns,
        &features,
    )?;
    let x = preprocessor.transform(&features);
    let estimator = outcome.best.fit(&x, &targets, config.seed);

    let feature_names = preprocessor.feature_names();
    let feature_importances = estimator.feature_importances();
    if let Some(importances) = &feature_importances {
        log_top_features(&feature_names, importances);
    }

    let model = PriceModel {
        preprocessor,
        estimator,
        winning_params: winning_params.clone(),
        cv_score: outcome.best_score,
        feature_names,
        feature_importances,
        trained_at: chrono::Utc::now().to_rfc3339(),
    };
    model.save(model_output)?;
    tracker.record_artifact(model_output);

    let test_rows: Vec<FeaturedListing> = io::read_csv(test_input)?;
    let test_metrics = evaluate_model(&model, &test_rows)?;
    let mut metric_values = BTreeMap::new();
    metric_values.insert("cv_neg_rmse".to_string(), outcome.best_score);
    metric_values.insert("test_mae".to_string(), test_metrics.mae);
    metric_values.insert("test_rmse".to_string(), test_metrics.rmse);
    metric_values.insert("test_r2".to_string(), test_metrics.r2);
    tracker.record_metrics(&metric_values);

    if let Some(path) = metrics_output {
        io::write_json(path, &test_metrics)?;
    }

    Ok(TrainSummary {
        winning_params,
        cv_score: outcome.best_score,
        test_metrics,
    })
}

fn log_top_features(names: &[String], importances: &[f64]) {
    let mut ranked: Vec<(&str, f64)> = names
        .iter()
        .map(String::as_str)
        .zip(importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (name, importance) in ranked.into_iter().take(10) {
        if importance > 0.0 {
            tracing::info!(feature = name, importance, "Feature importance");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::trainer::{BoostingConfig, ForestGridConfig, TreeGridConfig};
    use crate::domain::model::{DomainEntry, ON_FOOT};
    use crate::domain::ports::NoopTracker;
    use crate::pipeline::features::domain_summary;
    use tempfile::TempDir;

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            cv_folds: 3,
            decision_tree: TreeGridConfig {
                max_depth: vec![2],
                min_samples_split: vec![2],
            },
            random_forest: ForestGridConfig {
                n_trees: 5,
                max_depth: vec![2],
                min_samples_split: vec![2],
            },
            gradient_boosting: BoostingConfig {
                n_rounds: 10,
                learning_rate: 0.1,
                max_depth: 2,
                min_samples_split: 2,
            },
            ..TrainerConfig::default()
        }
    }

    fn synthetic_table(n: usize) -> Vec<FeaturedListing> {
        (0..n)
            .map(|i| {
                let area = 20.0 + (i % 17) as f64 * 4.0;
                FeaturedListing {
                    flat_status: i % 2 == 0,
                    num_of_rooms: match i % 3 {
                        0 => "Студия",
                        1 => "1-комнатная",
                        _ => "2-комнатная",
                    }
                    .to_string(),
                    total_area_m2: area,
                    living_area_m2: area * 0.6,
                    kitchen_area_m2: area * 0.2,
                    floor: (i % 12 + 1) as u32,
                    price: area * 120_000.0 + (i % 5) as f64 * 30_000.0,
                    metro_station: if i % 2 == 0 { "Озерки" } else { "Девяткино" }.to_string(),
                    minutes_to_metro: (i % 20 + 1) as u32,
                    transfer_type: ON_FOOT.to_string(),
                    house_age: (i % 50) as u32,
                    is_future_building: i % 9 == 0,
                }
            })
            .collect()
    }

    #[test]
    fn train_produces_a_usable_artifact_and_metrics() {
        let dir = TempDir::new().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        let model_path = dir.path().join("model.json");
        let metrics_path = dir.path().join("metrics.json");

        let table = synthetic_table(48);
        let (train_rows, test_rows) = table.split_at(36);
        io::write_csv(&train_path, train_rows).unwrap();
        io::write_csv(&test_path, test_rows).unwrap();

        let summary = run(
            &train_path,
            &test_path,
            &model_path,
            Some(&metrics_path),
            &small_config(),
            &NoopTracker,
            &SystemMonitor::new(false),
        )
        .unwrap();

        assert!(summary.winning_params.contains_key("model"));
        assert!(summary.cv_score.is_finite());
        assert!(summary.test_metrics.rmse.is_finite());

        let model = PriceModel::load(&model_path).unwrap();
        let prediction = model.predict(&test_rows[0].features());
        assert!(prediction.is_finite());

        let written: MetricsReport = io::read_json(&metrics_path).unwrap();
        assert_eq!(written, summary.test_metrics);
    }

    #[test]
    fn search_failure_writes_no_artifact() {
        let dir = TempDir::new().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        let model_path = dir.path().join("model.json");

        // Two rows cannot be split into three folds.
        let table = synthetic_table(2);
        io::write_csv(&train_path, &table).unwrap();
        io::write_csv(&test_path, &table).unwrap();

        let result = run(
            &train_path,
            &test_path,
            &model_path,
            None,
            &small_config(),
            &NoopTracker,
            &SystemMonitor::new(false),
        );

        assert!(result.is_err());
        assert!(!model_path.exists());
    }

    #[test]
    fn domain_summary_of_training_table_enumerates_rooms_without_sentinel() {
        // Companion check that the summary the form relies on matches the
        // training data the model sees.
        let table = synthetic_table(30);
        let domain = domain_summary(&table);
        match &domain["num_of_rooms"] {
            DomainEntry::Categorical(values) => {
                assert!(values.contains(&"Студия".to_string()));
                assert!(!values.contains(&"Неизвестно".to_string()));
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }
}
