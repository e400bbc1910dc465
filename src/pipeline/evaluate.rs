//! Evaluation stage: score a persisted model against held-out data and emit
//! the metrics report. Pure with respect to both inputs.

use crate::domain::model::{FeaturedListing, MetricsReport};
use crate::model::metrics::{mean_absolute_error, r2_score, root_mean_squared_error};
use crate::model::PriceModel;
use crate::utils::error::{PipelineError, Result};
use crate::utils::io;
use std::path::Path;

/// Score `model` on `rows`. Mutates neither input; calling it twice on the
/// same pair yields identical reports.
pub fn evaluate_model(model: &PriceModel, rows: &[FeaturedListing]) -> Result<MetricsReport> {
    if rows.is_empty() {
        return Err(PipelineError::schema("test table contains no rows"));
    }

    let actual: Vec<f64> = rows.iter().map(|r| r.price).collect();
    let features: Vec<_> = rows.iter().map(FeaturedListing::features).collect();
    let predicted = model.predict_batch(&features);

    Ok(MetricsReport {
        mae: mean_absolute_error(&actual, &predicted),
        rmse: root_mean_squared_error(&actual, &predicted),
        r2: r2_score(&actual, &predicted),
    })
}

pub fn run(test_input: &Path, model_input: &Path, output: &Path) -> Result<MetricsReport> {
    let rows: Vec<FeaturedListing> = io::read_csv(test_input)?;
    let model = PriceModel::load(model_input)?;

    let report = evaluate_model(&model, &rows)?;
    io::write_json(output, &report)?;

    tracing::info!(
        mae = report.mae,
        rmse = report.rmse,
        r2 = report.r2,
        "Evaluation completed"
    );
    Ok(report)
}
