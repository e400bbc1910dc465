//! The persisted model artifact: fitted preprocessor + fitted estimator plus
//! the metadata a consumer needs to trust it. Immutable once written.

use crate::domain::model::ListingFeatures;
use crate::model::preprocess::Preprocessor;
use crate::model::search::FittedEstimator;
use crate::utils::error::Result;
use crate::utils::io;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModel {
    pub preprocessor: Preprocessor,
    pub estimator: FittedEstimator,
    pub winning_params: BTreeMap<String, String>,
    pub cv_score: f64,
    pub feature_names: Vec<String>,
    /// Present for tree-based winners only.
    pub feature_importances: Option<Vec<f64>>,
    pub trained_at: String,
}

impl PriceModel {
    pub fn predict(&self, listing: &ListingFeatures) -> f64 {
        let encoded = self.preprocessor.transform_one(listing);
        self.estimator.predict_row(&encoded)
    }

    pub fn predict_batch(&self, listings: &[ListingFeatures]) -> Vec<f64> {
        listings.iter().map(|l| self.predict(l)).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        io::read_json(path)
    }
}
