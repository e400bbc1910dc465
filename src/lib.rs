pub mod config;
pub mod domain;
pub mod model;
pub mod pipeline;
pub mod serve;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{Cli, Command};
pub use config::trainer::TrainerConfig;
pub use domain::model::{
    CleanedListing, FeatureDomain, FeaturedListing, ListingFeatures, MetricsReport,
};
pub use domain::ports::{ExperimentTracker, LogTracker, NoopTracker};
pub use model::PriceModel;
pub use utils::error::{PipelineError, Result};
