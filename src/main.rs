use chrono::Datelike;
use clap::Parser;
use flatprice::config::cli::{Cli, Command};
use flatprice::utils::logger;
use flatprice::utils::monitor::SystemMonitor;
use flatprice::{pipeline, serve, LogTracker, TrainerConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The service logs JSON for log collectors; the batch stages log
    // compact lines for a terminal.
    match &cli.command {
        Command::Serve { .. } => logger::init_service_logger(),
        _ => logger::init_cli_logger(cli.verbose),
    }

    if let Err(e) = run(cli).await {
        tracing::error!("Stage failed: {e}");
        eprintln!("❌ {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> flatprice::Result<()> {
    match cli.command {
        Command::Clean { input, output } => {
            let stats = pipeline::clean::run(&input, &output)?;
            println!(
                "✅ Cleaned {} rows into {} ({} kept)",
                stats.rows_in,
                output.display(),
                stats.rows_out
            );
        }

        Command::Features {
            input,
            output,
            domain,
            year,
        } => {
            let current_year = year.unwrap_or_else(|| chrono::Local::now().year());
            let stats = pipeline::features::run(&input, &output, &domain, current_year)?;
            println!(
                "✅ Derived features for {} rows into {} (domain: {})",
                stats.rows,
                output.display(),
                domain.display()
            );
        }

        Command::Split {
            input,
            train,
            test,
            seed,
        } => {
            let stats = pipeline::split::run(&input, &train, &test, seed)?;
            println!(
                "✅ Split into {} train / {} test rows",
                stats.train_rows, stats.test_rows
            );
        }

        Command::Train {
            train,
            test,
            model,
            metrics,
            config,
            monitor,
        } => {
            let trainer_config = match config {
                Some(path) => TrainerConfig::from_toml_file(&path)?,
                None => TrainerConfig::default(),
            };
            let monitor = SystemMonitor::new(monitor);
            let summary = pipeline::train::run(
                &train,
                &test,
                &model,
                metrics.as_deref(),
                &trainer_config,
                &LogTracker,
                &monitor,
            )?;
            println!(
                "✅ Best model `{}` (CV score {:.2}) saved to {}",
                summary.winning_params["model"],
                summary.cv_score,
                model.display()
            );
            println!(
                "   Test metrics: mae={:.2} rmse={:.2} r2={:.4}",
                summary.test_metrics.mae, summary.test_metrics.rmse, summary.test_metrics.r2
            );
        }

        Command::Evaluate {
            test,
            model,
            output,
        } => {
            let report = pipeline::evaluate::run(&test, &model, &output)?;
            println!(
                "✅ Metrics written to {}: mae={:.2} rmse={:.2} r2={:.4}",
                output.display(),
                report.mae,
                report.rmse,
                report.r2
            );
        }

        Command::Serve {
            model,
            domain,
            addr,
        } => {
            serve::run(&model, domain.as_deref(), &addr).await?;
        }
    }

    Ok(())
}
