use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Version 1 of the raw export layout. Upstream files carry inconsistent
/// header names, so columns are renamed positionally into this canonical
/// order. A width mismatch is a schema violation and aborts the stage.
pub const RAW_SCHEMA_V1: [&str; 9] = [
    "metro_info",
    "flat_status",
    "num_of_rooms",
    "total_area_m2",
    "living_area_m2",
    "kitchen_area_m2",
    "floor",
    "year_of_building",
    "price",
];

/// Listings priced at or above this are treated as outliers and dropped.
pub const MAX_PRICE: f64 = 30_000_000.0;
/// Listings with a total area at or above this are dropped.
pub const MAX_TOTAL_AREA: f64 = 150.0;

/// Sentinel label for room counts that could not be recognized.
pub const UNKNOWN_ROOMS: &str = "Неизвестно";
/// Canonical studio label.
pub const STUDIO: &str = "Студия";
/// Studio spelling variant collapsed into [`STUDIO`].
pub const STUDIO_VARIANT: &str = "Апартаменты-студия";
/// Readability suffix appended to numeric room-count labels.
pub const ROOM_LABEL_SUFFIX: &str = "атная";
/// Garbled room-count tokens observed in the raw export.
pub const GARBLED_ROOM_TOKENS: [&str; 5] =
    ["Многокомнатны", "Многокомнатна", "15/4", "Квартир", "29/4"];

/// Travel-time sentinel for stations that have not opened yet.
pub const OPENING_SOON: &str = "откроется";
/// Stand-in duration for [`OPENING_SOON`] stations, in minutes.
pub const OPENING_SOON_MINUTES: u32 = 10;

/// Display label for the `legs` transport mode.
pub const ON_FOOT: &str = "пешком";
/// Display label for the `car` transport mode.
pub const BY_CAR: &str = "на машине";

/// Columns one-hot encoded by the default trainer configuration.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "flat_status",
    "num_of_rooms",
    "metro_station",
    "transfer_type",
    "is_future_building",
];

/// Columns standardized by the default trainer configuration.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "total_area_m2",
    "living_area_m2",
    "kitchen_area_m2",
    "floor",
    "minutes_to_metro",
    "house_age",
];

/// Target column name.
pub const TARGET_COLUMN: &str = "price";

/// Accepts `true`/`false` in any casing plus `0`/`1`, which is what the raw
/// exports actually contain.
fn de_flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_bool(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid boolean value: `{raw}`"))
    })
}

pub fn parse_flexible_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

/// A listing after cleaning: canonical column names, normalized room labels,
/// outliers removed. The raw proximity descriptor is still attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedListing {
    pub metro_info: String,
    #[serde(deserialize_with = "de_flexible_bool")]
    pub flat_status: bool,
    pub num_of_rooms: String,
    pub total_area_m2: f64,
    pub living_area_m2: f64,
    pub kitchen_area_m2: f64,
    pub floor: u32,
    pub year_of_building: i32,
    pub price: f64,
}

/// A listing after feature derivation. The proximity descriptor and build
/// year are replaced by the derived columns; `price` is the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedListing {
    #[serde(deserialize_with = "de_flexible_bool")]
    pub flat_status: bool,
    pub num_of_rooms: String,
    pub total_area_m2: f64,
    pub living_area_m2: f64,
    pub kitchen_area_m2: f64,
    pub floor: u32,
    pub price: f64,
    pub metro_station: String,
    pub minutes_to_metro: u32,
    pub transfer_type: String,
    pub house_age: u32,
    #[serde(deserialize_with = "de_flexible_bool")]
    pub is_future_building: bool,
}

/// The eleven input features, without the target. This is what the trained
/// model consumes and what the prediction service accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingFeatures {
    pub flat_status: bool,
    pub num_of_rooms: String,
    pub total_area_m2: f64,
    pub living_area_m2: f64,
    pub kitchen_area_m2: f64,
    pub floor: u32,
    pub metro_station: String,
    pub minutes_to_metro: u32,
    pub transfer_type: String,
    pub house_age: u32,
    pub is_future_building: bool,
}

impl FeaturedListing {
    pub fn features(&self) -> ListingFeatures {
        ListingFeatures {
            flat_status: self.flat_status,
            num_of_rooms: self.num_of_rooms.clone(),
            total_area_m2: self.total_area_m2,
            living_area_m2: self.living_area_m2,
            kitchen_area_m2: self.kitchen_area_m2,
            floor: self.floor,
            metro_station: self.metro_station.clone(),
            minutes_to_metro: self.minutes_to_metro,
            transfer_type: self.transfer_type.clone(),
            house_age: self.house_age,
            is_future_building: self.is_future_building,
        }
    }
}

impl ListingFeatures {
    /// Value of a categorical column, rendered the way the encoder sees it.
    /// Returns `None` for column names that are not categorical.
    pub fn categorical_value(&self, column: &str) -> Option<String> {
        match column {
            "flat_status" => Some(self.flat_status.to_string()),
            "num_of_rooms" => Some(self.num_of_rooms.clone()),
            "metro_station" => Some(self.metro_station.clone()),
            "transfer_type" => Some(self.transfer_type.clone()),
            "is_future_building" => Some(self.is_future_building.to_string()),
            _ => None,
        }
    }

    /// Value of a numeric column. Returns `None` for column names that are
    /// not numeric.
    pub fn numeric_value(&self, column: &str) -> Option<f64> {
        match column {
            "total_area_m2" => Some(self.total_area_m2),
            "living_area_m2" => Some(self.living_area_m2),
            "kitchen_area_m2" => Some(self.kitchen_area_m2),
            "floor" => Some(f64::from(self.floor)),
            "minutes_to_metro" => Some(f64::from(self.minutes_to_metro)),
            "house_age" => Some(f64::from(self.house_age)),
            _ => None,
        }
    }
}

/// One entry of the feature-domain summary: either the enumerated values of
/// a categorical column or the observed integer bounds of a numeric one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainEntry {
    Categorical(Vec<String>),
    Numeric { min: i64, max: i64 },
}

/// Mapping from feature name to its allowed value set or range, computed
/// once after feature derivation and reused by input validators and UIs.
pub type FeatureDomain = BTreeMap<String, DomainEntry>;

/// Evaluation metrics for a trained model on held-out data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_bool_accepts_capitalized_and_numeric_booleans() {
        assert_eq!(parse_flexible_bool("True"), Some(true));
        assert_eq!(parse_flexible_bool("false"), Some(false));
        assert_eq!(parse_flexible_bool("1"), Some(true));
        assert_eq!(parse_flexible_bool("0"), Some(false));
        assert_eq!(parse_flexible_bool("yes"), None);
    }

    #[test]
    fn domain_entry_json_shapes() {
        let cat = DomainEntry::Categorical(vec!["Студия".to_string()]);
        assert_eq!(serde_json::to_string(&cat).unwrap(), r#"["Студия"]"#);

        let num = DomainEntry::Numeric { min: 1, max: 30 };
        assert_eq!(serde_json::to_string(&num).unwrap(), r#"{"min":1,"max":30}"#);
    }

    #[test]
    fn categorical_accessor_covers_default_columns() {
        let features = sample_features();
        for column in CATEGORICAL_COLUMNS {
            assert!(features.categorical_value(column).is_some(), "{column}");
        }
        for column in NUMERIC_COLUMNS {
            assert!(features.numeric_value(column).is_some(), "{column}");
        }
        assert!(features.categorical_value("price").is_none());
        assert!(features.numeric_value("price").is_none());
    }

    fn sample_features() -> ListingFeatures {
        ListingFeatures {
            flat_status: false,
            num_of_rooms: "Студия".to_string(),
            total_area_m2: 30.0,
            living_area_m2: 20.0,
            kitchen_area_m2: 8.0,
            floor: 3,
            metro_station: "Девяткино".to_string(),
            minutes_to_metro: 10,
            transfer_type: ON_FOOT.to_string(),
            house_age: 5,
            is_future_building: false,
        }
    }
}
