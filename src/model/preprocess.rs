//! Fitted preprocessing transform: one-hot encoding for categorical columns
//! and standardization for numeric columns, composed column-wise in the
//! configured order. Fitted on the training set only and serialized with the
//! model artifact.

use crate::domain::model::ListingFeatures;
use crate::model::Matrix;
use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoding of a single categorical column. The first (sorted)
/// category is dropped to avoid collinearity; a value matching no retained
/// category (unknown, or the dropped level) encodes to an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoding {
    pub column: String,
    pub retained: Vec<String>,
}

/// Standardization statistics of a single numeric column, computed on the
/// training set. A constant column keeps scale 1.0 so transforming never
/// divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaling {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    categorical: Vec<CategoricalEncoding>,
    numeric: Vec<NumericScaling>,
}

impl Preprocessor {
    pub fn fit(
        categorical_columns: &[String],
        numeric_columns: &[String],
        rows: &[ListingFeatures],
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::schema(
                "cannot fit preprocessor on an empty dataset",
            ));
        }

        let mut categorical = Vec::with_capacity(categorical_columns.len());
        for column in categorical_columns {
            let mut values = BTreeSet::new();
            for row in rows {
                let value = row.categorical_value(column).ok_or_else(|| {
                    PipelineError::config(
                        "categorical_columns",
                        format!("`{column}` is not a categorical column"),
                    )
                })?;
                values.insert(value);
            }
            // BTreeSet iterates sorted; dropping the first level mirrors the
            // drop-first contract.
            let retained = values.into_iter().skip(1).collect();
            categorical.push(CategoricalEncoding {
                column: column.clone(),
                retained,
            });
        }

        let mut numeric = Vec::with_capacity(numeric_columns.len());
        for column in numeric_columns {
            let mut sum = 0.0;
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                let value = row.numeric_value(column).ok_or_else(|| {
                    PipelineError::config(
                        "numeric_columns",
                        format!("`{column}` is not a numeric column"),
                    )
                })?;
                sum += value;
                values.push(value);
            }
            let mean = sum / values.len() as f64;
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            let std = variance.sqrt();
            let scale = if std > 0.0 { std } else { 1.0 };
            numeric.push(NumericScaling {
                column: column.clone(),
                mean,
                scale,
            });
        }

        Ok(Self {
            categorical,
            numeric,
        })
    }

    /// Number of output feature columns.
    pub fn n_output_features(&self) -> usize {
        let cat: usize = self.categorical.iter().map(|c| c.retained.len()).sum();
        cat + self.numeric.len()
    }

    /// Names of the output feature columns, categorical blocks first.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_output_features());
        for encoding in &self.categorical {
            for value in &encoding.retained {
                names.push(format!("{}={}", encoding.column, value));
            }
        }
        for scaling in &self.numeric {
            names.push(scaling.column.clone());
        }
        names
    }

    pub fn transform_one(&self, row: &ListingFeatures) -> Vec<f64> {
        let mut encoded = Vec::with_capacity(self.n_output_features());
        for encoding in &self.categorical {
            // Missing accessors cannot happen for a fitted column set.
            let value = row.categorical_value(&encoding.column).unwrap_or_default();
            for retained in &encoding.retained {
                encoded.push(if *retained == value { 1.0 } else { 0.0 });
            }
        }
        for scaling in &self.numeric {
            let value = row.numeric_value(&scaling.column).unwrap_or(scaling.mean);
            encoded.push((value - scaling.mean) / scaling.scale);
        }
        encoded
    }

    pub fn transform(&self, rows: &[ListingFeatures]) -> Matrix {
        Matrix::from_rows(rows.iter().map(|row| self.transform_one(row)).collect())
    }
}
