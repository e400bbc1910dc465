use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flatprice")]
#[command(about = "Real-estate price prediction pipeline")]
pub struct Cli {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean a raw listings export into the canonical schema
    Clean {
        input: PathBuf,
        output: PathBuf,
    },

    /// Derive features and emit the feature-domain summary
    Features {
        input: PathBuf,
        output: PathBuf,
        domain: PathBuf,
        #[arg(long, help = "Override the current year used for house age")]
        year: Option<i32>,
    },

    /// Split a featured table into train and test tables
    Split {
        input: PathBuf,
        train: PathBuf,
        test: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Grid-search candidate models and persist the best pipeline
    Train {
        train: PathBuf,
        test: PathBuf,
        model: PathBuf,
        #[arg(long, help = "Also write a metrics report for the test table")]
        metrics: Option<PathBuf>,
        #[arg(long, help = "Trainer configuration TOML")]
        config: Option<PathBuf>,
        #[arg(long, help = "Enable system monitoring during the search")]
        monitor: bool,
    },

    /// Score a persisted model against held-out data
    Evaluate {
        test: PathBuf,
        model: PathBuf,
        output: PathBuf,
    },

    /// Serve a trained model over HTTP
    Serve {
        model: PathBuf,
        #[arg(long, help = "Feature-domain summary used for input validation")]
        domain: Option<PathBuf>,
        #[arg(long, default_value = "0.0.0.0:5000")]
        addr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_seed_defaults_to_42() {
        let cli = Cli::parse_from(["flatprice", "split", "in.csv", "train.csv", "test.csv"]);
        match cli.command {
            Command::Split { seed, .. } => assert_eq!(seed, 42),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn train_accepts_optional_metrics_and_config() {
        let cli = Cli::parse_from([
            "flatprice",
            "train",
            "train.csv",
            "test.csv",
            "model.json",
            "--metrics",
            "metrics.json",
        ]);
        match cli.command {
            Command::Train {
                metrics, config, ..
            } => {
                assert_eq!(metrics, Some(PathBuf::from("metrics.json")));
                assert_eq!(config, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
