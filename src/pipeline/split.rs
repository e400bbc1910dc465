//! Splitting stage: deterministic 75/25 train/test partition after removing
//! duplicate rows. The same seed and input always reproduce the same split.

use crate::domain::model::FeaturedListing;
use crate::utils::error::{PipelineError, Result};
use crate::utils::io;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.75;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy)]
pub struct SplitStats {
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Partition rows into train and test by a seeded uniform shuffle without
/// replacement. Input order is preserved inside each partition.
pub fn split(
    rows: Vec<FeaturedListing>,
    train_fraction: f64,
    seed: u64,
) -> (Vec<FeaturedListing>, Vec<FeaturedListing>) {
    let rows = io::dedup_exact(rows);
    let n = rows.len();
    let train_size = (n as f64 * train_fraction).round() as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut train_indices = indices[..train_size].to_vec();
    let mut test_indices = indices[train_size..].to_vec();
    train_indices.sort_unstable();
    test_indices.sort_unstable();

    let mut train = Vec::with_capacity(train_indices.len());
    let mut test = Vec::with_capacity(test_indices.len());
    let mut rows: Vec<Option<FeaturedListing>> = rows.into_iter().map(Some).collect();
    for i in train_indices {
        train.push(rows[i].take().expect("index selected once"));
    }
    for i in test_indices {
        test.push(rows[i].take().expect("index selected once"));
    }

    (train, test)
}

pub fn run(input: &Path, train_output: &Path, test_output: &Path, seed: u64) -> Result<SplitStats> {
    let rows: Vec<FeaturedListing> = io::read_csv(input)?;
    if rows.is_empty() {
        return Err(PipelineError::schema("featured table contains no rows"));
    }

    let (train, test) = split(rows, DEFAULT_TRAIN_FRACTION, seed);
    io::write_csv(train_output, &train)?;
    io::write_csv(test_output, &test)?;

    let stats = SplitStats {
        train_rows: train.len(),
        test_rows: test.len(),
    };
    tracing::info!(
        train_rows = stats.train_rows,
        test_rows = stats.test_rows,
        seed,
        "Split completed"
    );
    Ok(stats)
}
