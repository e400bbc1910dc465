//! End-to-end pipeline tests: raw export -> cleaned -> featured ->
//! {train, test} -> model -> metrics, all through real files.

use flatprice::config::trainer::{BoostingConfig, ForestGridConfig, TreeGridConfig};
use flatprice::domain::model::DomainEntry;
use flatprice::pipeline::{clean, evaluate, features, split, train};
use flatprice::utils::io;
use flatprice::utils::monitor::SystemMonitor;
use flatprice::{FeatureDomain, FeaturedListing, MetricsReport, NoopTracker, PriceModel, TrainerConfig};
use std::path::Path;
use tempfile::TempDir;

const CURRENT_YEAR: i32 = 2024;

fn descriptor(station: &str, time: &str, mode: &str) -> String {
    format!(
        "{{'Underground name': ['{station}', 'Пушкинская', 'Обводный канал'], \
         'Underground time': [{time}, 7, 12], \
         'Transport type': ['{mode}', 'legs', 'car']}}"
    )
}

/// A raw export with scrambled header names and one studio-scenario row:
/// a studio-apartment label variant, a build year in the future and a
/// nearest station that has not opened yet.
fn write_raw_export(path: &Path) {
    let mut data = Vec::new();
    let mut writer = csv::Writer::from_writer(&mut data);
    writer
        .write_record([
            "Metro",
            "Status",
            "Rooms",
            "Total area",
            "Living area",
            "Kitchen area",
            "Floor",
            "Year",
            "Price",
        ])
        .unwrap();

    // The scenario row.
    writer
        .write_record([
            descriptor("Studio Station", "'откроется'", "car").as_str(),
            "False",
            "Апартаменты-студия",
            "28.5",
            "19.0",
            "6.5",
            "4",
            "2030",
            "6500000.0",
        ])
        .unwrap();

    for i in 0..40u32 {
        let station = if i % 2 == 0 { "Озерки" } else { "Девяткино" };
        let rooms = match i % 3 {
            0 => "Студия",
            1 => "1-комн",
            _ => "2-комн",
        };
        let area = 25.0 + f64::from(i % 13) * 6.0;
        let price = area * 110_000.0 + f64::from(i % 7) * 45_000.0;
        let time = (i % 15 + 3).to_string();
        writer
            .write_record([
                descriptor(station, &time, if i % 4 == 0 { "car" } else { "legs" }).as_str(),
                if i % 2 == 0 { "True" } else { "False" },
                rooms,
                &format!("{area:.1}"),
                &format!("{:.1}", area * 0.55),
                &format!("{:.1}", area * 0.2),
                &(i % 16 + 1).to_string(),
                &(1960 + i as i32).to_string(),
                &format!("{price:.1}"),
            ])
            .unwrap();
    }

    writer.flush().unwrap();
    drop(writer);
    std::fs::write(path, data).unwrap();
}

fn small_trainer_config() -> TrainerConfig {
    TrainerConfig {
        cv_folds: 3,
        decision_tree: TreeGridConfig {
            max_depth: vec![2, 3],
            min_samples_split: vec![2],
        },
        random_forest: ForestGridConfig {
            n_trees: 10,
            max_depth: vec![3],
            min_samples_split: vec![2],
        },
        gradient_boosting: BoostingConfig {
            n_rounds: 20,
            learning_rate: 0.1,
            max_depth: 2,
            min_samples_split: 2,
        },
        ..TrainerConfig::default()
    }
}

#[test]
fn full_pipeline_from_raw_export_to_metrics() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");
    let featured = dir.path().join("featured.csv");
    let domain = dir.path().join("domain.json");
    let train_table = dir.path().join("train.csv");
    let test_table = dir.path().join("test.csv");
    let model_path = dir.path().join("model.json");
    let metrics_path = dir.path().join("metrics.json");

    write_raw_export(&raw);

    let clean_stats = clean::run(&raw, &cleaned).unwrap();
    assert_eq!(clean_stats.rows_in, 41);
    assert_eq!(clean_stats.rows_out, 41);

    features::run(&cleaned, &featured, &domain, CURRENT_YEAR).unwrap();

    // The studio-scenario row made it through with the expected derivations.
    let rows: Vec<FeaturedListing> = io::read_csv(&featured).unwrap();
    let scenario = rows
        .iter()
        .find(|r| r.metro_station == "Studio Station")
        .expect("scenario row present");
    assert_eq!(scenario.num_of_rooms, "Студия");
    assert_eq!(scenario.house_age, 0);
    assert!(scenario.is_future_building);
    assert_eq!(scenario.minutes_to_metro, 10);
    assert_eq!(scenario.transfer_type, "на машине");

    // Room labels got their readability suffix.
    assert!(rows.iter().any(|r| r.num_of_rooms == "1-комнатная"));
    assert!(rows.iter().any(|r| r.num_of_rooms == "2-комнатная"));

    // Domain summary enumerates stations and rooms, bounds the numerics.
    let summary: FeatureDomain = io::read_json(&domain).unwrap();
    match &summary["metro_station"] {
        DomainEntry::Categorical(stations) => {
            assert!(stations.contains(&"Studio Station".to_string()));
            assert!(stations.contains(&"Озерки".to_string()));
        }
        other => panic!("unexpected entry: {other:?}"),
    }
    match &summary["minutes_to_metro"] {
        DomainEntry::Numeric { min, max } => {
            assert!(*min >= 1);
            assert!(*max <= 60);
        }
        other => panic!("unexpected entry: {other:?}"),
    }

    let split_stats = split::run(&featured, &train_table, &test_table, 42).unwrap();
    assert_eq!(split_stats.train_rows + split_stats.test_rows, 41);
    assert_eq!(split_stats.train_rows, 31);

    let summary = train::run(
        &train_table,
        &test_table,
        &model_path,
        Some(&metrics_path),
        &small_trainer_config(),
        &NoopTracker,
        &SystemMonitor::new(false),
    )
    .unwrap();
    assert!(summary.cv_score.is_finite());

    let model = PriceModel::load(&model_path).unwrap();
    let prediction = model.predict(&scenario.features());
    assert!(prediction.is_finite());

    // Evaluating the persisted artifact reproduces the trainer's metrics.
    let eval_path = dir.path().join("eval.json");
    let report = evaluate::run(&test_table, &model_path, &eval_path).unwrap();
    assert_eq!(report, summary.test_metrics);

    let written: MetricsReport = io::read_json(&metrics_path).unwrap();
    assert_eq!(written, report);
}

#[test]
fn cleaning_its_own_output_is_a_fixed_point() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.csv");
    let once = dir.path().join("once.csv");
    let twice = dir.path().join("twice.csv");

    write_raw_export(&raw);
    clean::run(&raw, &once).unwrap();
    clean::run(&once, &twice).unwrap();

    assert_eq!(
        std::fs::read_to_string(&once).unwrap(),
        std::fs::read_to_string(&twice).unwrap()
    );
}

#[test]
fn split_is_reproducible_across_runs() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");
    let featured = dir.path().join("featured.csv");
    let domain = dir.path().join("domain.json");

    write_raw_export(&raw);
    clean::run(&raw, &cleaned).unwrap();
    features::run(&cleaned, &featured, &domain, CURRENT_YEAR).unwrap();

    let train_a = dir.path().join("train_a.csv");
    let test_a = dir.path().join("test_a.csv");
    let train_b = dir.path().join("train_b.csv");
    let test_b = dir.path().join("test_b.csv");

    split::run(&featured, &train_a, &test_a, 42).unwrap();
    split::run(&featured, &train_b, &test_b, 42).unwrap();

    assert_eq!(
        std::fs::read(&train_a).unwrap(),
        std::fs::read(&train_b).unwrap()
    );
    assert_eq!(
        std::fs::read(&test_a).unwrap(),
        std::fs::read(&test_b).unwrap()
    );
}

#[test]
fn malformed_raw_export_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.csv");
    let cleaned = dir.path().join("cleaned.csv");

    // Wrong column count.
    std::fs::write(&raw, "a,b,c\n1,2,3\n").unwrap();
    let err = clean::run(&raw, &cleaned).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(!cleaned.exists());

    // Right width, non-numeric price.
    let mut data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut data);
        writer
            .write_record(["m", "s", "r", "ta", "la", "ka", "f", "y", "p"])
            .unwrap();
        writer
            .write_record([
                descriptor("Озерки", "5", "legs").as_str(),
                "True",
                "Студия",
                "30.0",
                "20.0",
                "8.0",
                "2",
                "2001",
                "dorogo",
            ])
            .unwrap();
        writer.flush().unwrap();
    }
    std::fs::write(&raw, data).unwrap();

    let err = clean::run(&raw, &cleaned).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(!cleaned.exists());
}
