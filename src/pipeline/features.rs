//! Feature-derivation stage: parse the per-listing proximity descriptor,
//! derive the metro, age and construction features, and emit the
//! feature-domain summary as a side artifact.

use crate::domain::model::{
    CleanedListing, DomainEntry, FeatureDomain, FeaturedListing, BY_CAR, ON_FOOT, OPENING_SOON,
    OPENING_SOON_MINUTES, UNKNOWN_ROOMS,
};
use crate::utils::error::{PipelineError, Result};
use crate::utils::io;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct FeatureStats {
    pub rows: usize,
}

/// The nearest transit station extracted from a proximity descriptor, with
/// the raw transport-mode token.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestStation {
    pub name: String,
    pub minutes: u32,
    pub raw_mode: String,
}

fn list_regex(key: &str) -> Regex {
    Regex::new(&format!(r"'{key}'\s*:\s*\[([^\]]*)\]")).expect("static pattern")
}

fn descriptor_regexes() -> &'static [Regex; 3] {
    static REGEXES: OnceLock<[Regex; 3]> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            list_regex("Underground name"),
            list_regex("Underground time"),
            list_regex("Transport type"),
        ]
    })
}

/// Split the body of a descriptor list on commas that are outside quotes,
/// stripping the quotes from each item.
fn split_list_items(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match (ch, quote) {
            ('\'' | '"', None) => quote = Some(ch),
            (q, Some(open)) if q == open => quote = None,
            (',', None) => {
                items.push(std::mem::take(&mut current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() || !items.is_empty() {
        items.push(current);
    }

    items.into_iter().map(|item| item.trim().to_string()).collect()
}

/// Parse a string-encoded proximity descriptor and keep only the nearest
/// (index 0) station triplet. The source guarantees the nearest-first
/// ordering, so no tie-breaking happens here.
pub fn parse_proximity(descriptor: &str) -> std::result::Result<NearestStation, String> {
    let [names_re, times_re, modes_re] = descriptor_regexes();

    let first = |re: &Regex, key: &str| -> std::result::Result<String, String> {
        let captures = re
            .captures(descriptor)
            .ok_or_else(|| format!("missing `{key}` list"))?;
        let items = split_list_items(&captures[1]);
        items
            .into_iter()
            .next()
            .filter(|item| !item.is_empty())
            .ok_or_else(|| format!("empty `{key}` list"))
    };

    let name = first(names_re, "Underground name")?;
    let time_token = first(times_re, "Underground time")?;
    let raw_mode = first(modes_re, "Transport type")?;

    let minutes = if time_token == OPENING_SOON {
        OPENING_SOON_MINUTES
    } else {
        time_token
            .parse::<u32>()
            .map_err(|_| format!("invalid travel time `{time_token}`"))?
    };

    Ok(NearestStation {
        name,
        minutes,
        raw_mode,
    })
}

/// Map a raw transport-mode token to its display label. Unrecognized tokens
/// pass through unchanged.
pub fn transfer_display_label(raw_mode: &str) -> String {
    match raw_mode {
        "legs" => ON_FOOT.to_string(),
        "car" => BY_CAR.to_string(),
        other => other.to_string(),
    }
}

/// Derive the feature columns for every cleaned listing. `current_year` is
/// explicit so derivation is reproducible in tests; the CLI passes the
/// wall-clock year.
pub fn derive(records: Vec<CleanedListing>, current_year: i32) -> Result<Vec<FeaturedListing>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let station = parse_proximity(&record.metro_info)
                .map_err(|message| PipelineError::parse(index as u64 + 1, message))?;

            let house_age = (current_year - record.year_of_building).max(0) as u32;
            let is_future_building = record.year_of_building > current_year;

            Ok(FeaturedListing {
                flat_status: record.flat_status,
                num_of_rooms: record.num_of_rooms,
                total_area_m2: record.total_area_m2,
                living_area_m2: record.living_area_m2,
                kitchen_area_m2: record.kitchen_area_m2,
                floor: record.floor,
                price: record.price,
                metro_station: station.name,
                minutes_to_metro: station.minutes,
                transfer_type: transfer_display_label(&station.raw_mode),
                house_age,
                is_future_building,
            })
        })
        .collect()
}

fn categorical_domain<F>(rows: &[FeaturedListing], value: F) -> DomainEntry
where
    F: Fn(&FeaturedListing) -> &str,
{
    let values: BTreeSet<String> = rows.iter().map(|r| value(r).to_string()).collect();
    DomainEntry::Categorical(values.into_iter().collect())
}

fn numeric_domain<F>(rows: &[FeaturedListing], value: F) -> DomainEntry
where
    F: Fn(&FeaturedListing) -> f64,
{
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in rows {
        let v = value(row);
        min = min.min(v);
        max = max.max(v);
    }
    DomainEntry::Numeric {
        min: min as i64,
        max: max as i64,
    }
}

/// Compute the feature-domain summary. The `Неизвестно` room label is a
/// filtered fallback, not a selectable option, so it is removed from the
/// enumerated domain even when present in the data.
pub fn domain_summary(rows: &[FeaturedListing]) -> FeatureDomain {
    let mut domain = FeatureDomain::new();

    let rooms_set: BTreeSet<String> = rows.iter().map(|r| r.num_of_rooms.clone()).collect();
    let mut rooms: Vec<String> = rooms_set.into_iter().collect();
    rooms.retain(|label| label != UNKNOWN_ROOMS);
    domain.insert("num_of_rooms".to_string(), DomainEntry::Categorical(rooms));

    domain.insert(
        "metro_station".to_string(),
        categorical_domain(rows, |r| &r.metro_station),
    );
    domain.insert(
        "transfer_type".to_string(),
        categorical_domain(rows, |r| &r.transfer_type),
    );

    domain.insert(
        "total_area_m2".to_string(),
        numeric_domain(rows, |r| r.total_area_m2),
    );
    domain.insert(
        "living_area_m2".to_string(),
        numeric_domain(rows, |r| r.living_area_m2),
    );
    domain.insert(
        "kitchen_area_m2".to_string(),
        numeric_domain(rows, |r| r.kitchen_area_m2),
    );
    domain.insert("floor".to_string(), numeric_domain(rows, |r| f64::from(r.floor)));
    domain.insert("price".to_string(), numeric_domain(rows, |r| r.price));
    domain.insert(
        "minutes_to_metro".to_string(),
        numeric_domain(rows, |r| f64::from(r.minutes_to_metro)),
    );
    domain.insert(
        "house_age".to_string(),
        numeric_domain(rows, |r| f64::from(r.house_age)),
    );
    domain.insert(
        "is_future_building".to_string(),
        numeric_domain(rows, |r| if r.is_future_building { 1.0 } else { 0.0 }),
    );

    domain
}

/// Read a cleaned table, derive features, and write the featured table plus
/// the domain-summary JSON, both atomically.
pub fn run(
    input: &Path,
    output: &Path,
    domain_output: &Path,
    current_year: i32,
) -> Result<FeatureStats> {
    let records: Vec<CleanedListing> = io::read_csv(input)?;
    if records.is_empty() {
        return Err(PipelineError::schema("cleaned table contains no rows"));
    }

    let featured = derive(records, current_year)?;
    let domain = domain_summary(&featured);

    io::write_csv(output, &featured)?;
    io::write_json(domain_output, &domain)?;

    let stats = FeatureStats {
        rows: featured.len(),
    };
    tracing::info!(rows = stats.rows, "Feature derivation completed");
    Ok(stats)
}
