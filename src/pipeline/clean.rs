//! Cleaning stage: positional rename into the canonical schema, room-label
//! normalization, outlier exclusion and exact-duplicate removal. Malformed
//! input aborts the stage; no partial output is written.

use crate::domain::model::{
    parse_flexible_bool, CleanedListing, GARBLED_ROOM_TOKENS, MAX_PRICE, MAX_TOTAL_AREA,
    RAW_SCHEMA_V1, ROOM_LABEL_SUFFIX, STUDIO, STUDIO_VARIANT, UNKNOWN_ROOMS,
};
use crate::utils::error::{PipelineError, Result};
use crate::utils::io;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct CleanStats {
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Collapse a raw room-count token into its canonical label. The suffix
/// append is guarded so that an already-canonical label passes through
/// unchanged, which keeps the whole stage idempotent.
pub fn normalize_room_label(raw: &str) -> String {
    if GARBLED_ROOM_TOKENS.contains(&raw) {
        return UNKNOWN_ROOMS.to_string();
    }
    let label = if raw == STUDIO_VARIANT { STUDIO } else { raw };
    if label == STUDIO || label == UNKNOWN_ROOMS || label.ends_with(ROOM_LABEL_SUFFIX) {
        label.to_string()
    } else {
        format!("{label}{ROOM_LABEL_SUFFIX}")
    }
}

/// Apply the cleaning policies to already-parsed rows: label normalization,
/// outlier exclusion, duplicate removal (first occurrence wins).
pub fn clean(records: Vec<CleanedListing>) -> Vec<CleanedListing> {
    let normalized = records
        .into_iter()
        .map(|mut record| {
            record.num_of_rooms = normalize_room_label(&record.num_of_rooms);
            record
        })
        .filter(|record| record.price < MAX_PRICE && record.total_area_m2 < MAX_TOTAL_AREA)
        .collect();
    io::dedup_exact(normalized)
}

fn parse_field<T: std::str::FromStr>(record: &csv::StringRecord, index: usize, row: u64) -> Result<T> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse().map_err(|_| {
        PipelineError::parse(
            row,
            format!("column `{}`: invalid value `{raw}`", RAW_SCHEMA_V1[index]),
        )
    })
}

/// Parse one raw row positionally against [`RAW_SCHEMA_V1`].
pub fn parse_raw_record(record: &csv::StringRecord, row: u64) -> Result<CleanedListing> {
    if record.len() != RAW_SCHEMA_V1.len() {
        return Err(PipelineError::schema(format!(
            "expected {} columns (raw schema v1), found {} at row {row}",
            RAW_SCHEMA_V1.len(),
            record.len()
        )));
    }

    let flat_status_raw = record.get(1).unwrap_or("").trim();
    let flat_status = parse_flexible_bool(flat_status_raw).ok_or_else(|| {
        PipelineError::parse(
            row,
            format!("column `flat_status`: invalid boolean `{flat_status_raw}`"),
        )
    })?;

    Ok(CleanedListing {
        metro_info: record.get(0).unwrap_or("").to_string(),
        flat_status,
        num_of_rooms: record.get(2).unwrap_or("").to_string(),
        total_area_m2: parse_field(record, 3, row)?,
        living_area_m2: parse_field(record, 4, row)?,
        kitchen_area_m2: parse_field(record, 5, row)?,
        floor: parse_field(record, 6, row)?,
        year_of_building: parse_field(record, 7, row)?,
        price: parse_field(record, 8, row)?,
    })
}

/// Read a raw export, clean it and write the canonical table atomically.
pub fn run(input: &Path, output: &Path) -> Result<CleanStats> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(input)?;

    // Header names are untrusted; only the column count is checked.
    let headers = reader.headers()?.clone();
    if headers.len() != RAW_SCHEMA_V1.len() {
        return Err(PipelineError::schema(format!(
            "expected {} columns (raw schema v1), found {} in header",
            RAW_SCHEMA_V1.len(),
            headers.len()
        )));
    }

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        records.push(parse_raw_record(&record, index as u64 + 1)?);
    }

    let rows_in = records.len();
    let cleaned = clean(records);
    let stats = CleanStats {
        rows_in,
        rows_out: cleaned.len(),
    };

    io::write_csv(output, &cleaned)?;
    tracing::info!(
        rows_in = stats.rows_in,
        rows_out = stats.rows_out,
        "Cleaning completed"
    );
    Ok(stats)
}
