//! Prediction service: a thin HTTP wrapper around a loaded model artifact.
//! Malformed requests are client errors and never take the process down;
//! the pipeline's strict-failure policy stops at this boundary.

use crate::domain::model::{DomainEntry, FeatureDomain, ListingFeatures};
use crate::model::PriceModel;
use crate::utils::error::Result;
use crate::utils::io;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

pub struct AppState {
    pub model: PriceModel,
    pub domain: Option<FeatureDomain>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(features): Json<ListingFeatures>,
) -> Response {
    let problems = validate_request(&features, state.domain.as_ref());
    if !problems.is_empty() {
        tracing::debug!(?problems, "Rejected prediction request");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": problems.join("; ")})),
        )
            .into_response();
    }

    let price = state.model.predict(&features);
    if !price.is_finite() {
        tracing::error!("Model produced a non-finite prediction");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "prediction failed"})),
        )
            .into_response();
    }

    tracing::debug!(price, "Prediction served");
    Json(json!({"prediction": {"price": price}})).into_response()
}

/// Field-level validation: positivity constraints always apply; categorical
/// membership and numeric ranges apply when a domain summary was loaded.
fn validate_request(features: &ListingFeatures, domain: Option<&FeatureDomain>) -> Vec<String> {
    let mut problems = Vec::new();

    let positives = [
        ("total_area_m2", features.total_area_m2),
        ("living_area_m2", features.living_area_m2),
        ("kitchen_area_m2", features.kitchen_area_m2),
        ("floor", f64::from(features.floor)),
        ("minutes_to_metro", f64::from(features.minutes_to_metro)),
    ];
    for (field, value) in positives {
        if !(value > 0.0) {
            problems.push(format!("`{field}` must be positive"));
        }
    }

    let Some(domain) = domain else {
        return problems;
    };

    let categorical = [
        ("num_of_rooms", features.num_of_rooms.as_str()),
        ("metro_station", features.metro_station.as_str()),
        ("transfer_type", features.transfer_type.as_str()),
    ];
    for (field, value) in categorical {
        if let Some(DomainEntry::Categorical(allowed)) = domain.get(field) {
            if !allowed.iter().any(|v| v == value) {
                problems.push(format!("`{field}` value `{value}` is not in the known domain"));
            }
        }
    }

    let numeric = [
        ("total_area_m2", features.total_area_m2),
        ("living_area_m2", features.living_area_m2),
        ("kitchen_area_m2", features.kitchen_area_m2),
        ("floor", f64::from(features.floor)),
        ("minutes_to_metro", f64::from(features.minutes_to_metro)),
        ("house_age", f64::from(features.house_age)),
    ];
    for (field, value) in numeric {
        if let Some(DomainEntry::Numeric { min, max }) = domain.get(field) {
            if value < *min as f64 || value > *max as f64 {
                problems.push(format!(
                    "`{field}` value {value} is outside the known range [{min}, {max}]"
                ));
            }
        }
    }

    problems
}

/// Load the artifact (and optional domain summary), bind and serve until the
/// process is stopped.
pub async fn run(model_path: &Path, domain_path: Option<&Path>, addr: &str) -> Result<()> {
    let model = PriceModel::load(model_path)?;
    tracing::info!(
        model = %model_path.display(),
        winner = %model
            .winning_params
            .get("model")
            .cloned()
            .unwrap_or_default(),
        "Model artifact loaded"
    );

    let domain = match domain_path {
        Some(path) => {
            let domain: FeatureDomain = io::read_json(path)?;
            tracing::info!(path = %path.display(), "Feature domain loaded for validation");
            Some(domain)
        }
        None => {
            tracing::warn!("No feature domain supplied; categorical inputs are not validated");
            None
        }
    };

    let state = Arc::new(AppState { model, domain });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Prediction service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
