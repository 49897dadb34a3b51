//! The ingestion contract (spec §6): catalog records arrive in either a new
//! or a legacy schema and are normalized into one struct that becomes the
//! vector's metadata. Ingestion itself is an external collaborator — this
//! crate only owns the shape everything downstream agrees on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub item_num: String,
    pub description: String,
    pub category: Option<String>,
    pub group: Option<String>,
    pub subgroup: Option<String>,
    pub subheading: Option<String>,
    pub schedule_fee: Option<f64>,
    pub derived_fee: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_min_minutes: Option<i32>,
    pub duration_max_minutes: Option<i32>,
    pub duration_min_inclusive: Option<bool>,
    pub duration_max_inclusive: Option<bool>,
}

/// The new ingestion schema, deserialized directly from catalog JSON/CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSchemaRecord {
    pub item_num: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub subgroup: Option<String>,
    #[serde(default)]
    pub subheading: Option<String>,
    #[serde(default)]
    pub schedule_fee: Option<f64>,
    #[serde(default)]
    pub derived_fee: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration_min_minutes: Option<i32>,
    #[serde(default)]
    pub duration_max_minutes: Option<i32>,
    #[serde(default)]
    pub duration_min_inclusive: Option<bool>,
    #[serde(default)]
    pub duration_max_inclusive: Option<bool>,
}

/// The legacy ingestion schema (PascalCase field names, no structured
/// duration hints).
#[derive(Debug, Clone, Deserialize)]
pub struct LegacySchemaRecord {
    #[serde(rename = "ItemNum")]
    pub item_num: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Group")]
    pub group: Option<String>,
    #[serde(rename = "ScheduleFee")]
    pub schedule_fee: Option<f64>,
    #[serde(rename = "ItemStartDate")]
    pub item_start_date: Option<NaiveDate>,
    #[serde(rename = "ItemEndDate")]
    pub item_end_date: Option<NaiveDate>,
}

impl From<NewSchemaRecord> for CatalogRecord {
    fn from(r: NewSchemaRecord) -> Self {
        Self {
            item_num: r.item_num,
            description: r.description,
            category: r.category,
            group: r.group,
            subgroup: r.subgroup,
            subheading: r.subheading,
            schedule_fee: r.schedule_fee,
            derived_fee: r.derived_fee,
            start_date: r.start_date,
            end_date: r.end_date,
            duration_min_minutes: r.duration_min_minutes,
            duration_max_minutes: r.duration_max_minutes,
            duration_min_inclusive: r.duration_min_inclusive,
            duration_max_inclusive: r.duration_max_inclusive,
        }
    }
}

impl From<LegacySchemaRecord> for CatalogRecord {
    fn from(r: LegacySchemaRecord) -> Self {
        Self {
            item_num: r.item_num,
            description: r.description,
            category: r.category,
            group: r.group,
            subgroup: None,
            subheading: None,
            schedule_fee: r.schedule_fee,
            derived_fee: None,
            start_date: r.item_start_date,
            end_date: r.item_end_date,
            duration_min_minutes: None,
            duration_max_minutes: None,
            duration_min_inclusive: None,
            duration_max_inclusive: None,
        }
    }
}

/// Parse a catalog record from either schema, new schema preferred.
pub fn parse_catalog_record(value: &serde_json::Value) -> Option<CatalogRecord> {
    if value.get("item_num").is_some() {
        serde_json::from_value::<NewSchemaRecord>(value.clone()).ok().map(Into::into)
    } else if value.get("ItemNum").is_some() {
        serde_json::from_value::<LegacySchemaRecord>(value.clone()).ok().map(Into::into)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_new_schema() {
        let v = json!({
            "item_num": "23",
            "description": "Level B consultation",
            "duration_min_minutes": 20,
        });
        let rec = parse_catalog_record(&v).unwrap();
        assert_eq!(rec.item_num, "23");
        assert_eq!(rec.duration_min_minutes, Some(20));
    }

    #[test]
    fn parses_legacy_schema() {
        let v = json!({
            "ItemNum": "104",
            "Description": "Specialist consultation",
            "Category": "1",
        });
        let rec = parse_catalog_record(&v).unwrap();
        assert_eq!(rec.item_num, "104");
        assert!(rec.duration_min_minutes.is_none());
    }

    #[test]
    fn unknown_schema_returns_none() {
        let v = json!({"foo": "bar"});
        assert!(parse_catalog_record(&v).is_none());
    }
}
