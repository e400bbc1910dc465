use std::collections::BTreeMap;
use std::path::Path;

/// Capability interface for experiment tracking. The trainer records every
/// trial through this trait so a real tracking backend can be plugged in
/// without becoming a hard dependency.
pub trait ExperimentTracker: Send + Sync {
    fn record_params(&self, params: &BTreeMap<String, String>);
    fn record_metrics(&self, metrics: &BTreeMap<String, f64>);
    fn record_artifact(&self, path: &Path);
}

/// Tracker that writes everything to the structured log.
#[derive(Debug, Default)]
pub struct LogTracker;

impl ExperimentTracker for LogTracker {
    fn record_params(&self, params: &BTreeMap<String, String>) {
        for (key, value) in params {
            tracing::info!(param = %key, value = %value, "experiment parameter");
        }
    }

    fn record_metrics(&self, metrics: &BTreeMap<String, f64>) {
        for (key, value) in metrics {
            tracing::info!(metric = %key, value, "experiment metric");
        }
    }

    fn record_artifact(&self, path: &Path) {
        tracing::info!(path = %path.display(), "experiment artifact");
    }
}

/// Tracker that discards everything. Useful in tests.
#[derive(Debug, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn record_params(&self, _params: &BTreeMap<String, String>) {}

    fn record_metrics(&self, _metrics: &BTreeMap<String, f64>) {}

    fn record_artifact(&self, _path: &Path) {}
}
