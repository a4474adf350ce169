//! A typed, serde-friendly view of one time series.

use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use serde_json::{Map, Value};

use crate::{
    entry::{DataEntry, field},
    metadata::MetaData,
    process::array::json_to_array,
    serialize::encode_real_array,
    timestamp::parse_naive,
};

/// One time series with its covariates, as produced by dataset builders.
///
/// `start` is kept unaligned; alignment happens when the record goes through
/// a dataset. Equality ignores [`TimeSeriesItem::metadata`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesItem {
    /// Start of the series.
    #[serde(deserialize_with = "start_from_json")]
    pub start: NaiveDateTime,
    /// Target values, `(T,)` or `(D, T)`.
    #[serde(serialize_with = "target_to_json", deserialize_with = "target_from_json")]
    pub target: ArrayD<f32>,
    /// Series identifier.
    #[serde(default)]
    pub item: Option<String>,

    /// Static categorical features.
    #[serde(default)]
    pub feat_static_cat: Vec<i32>,
    /// Static real-valued features.
    #[serde(default)]
    pub feat_static_real: Vec<f32>,
    /// Dynamic categorical features, one row per feature.
    #[serde(default)]
    pub feat_dynamic_cat: Vec<Vec<i32>>,
    /// Dynamic real-valued features, one row per feature.
    #[serde(default)]
    pub feat_dynamic_real: Vec<Vec<f32>>,

    /// Free-form information about where the item came from.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn start_from_json<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_naive(&raw).map_err(D::Error::custom)
}

fn target_to_json<S>(target: &ArrayD<f32>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    encode_real_array(target).serialize(serializer)
}

fn target_from_json<'de, D>(deserializer: D) -> Result<ArrayD<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    json_to_array(field::TARGET, &raw).map_err(D::Error::custom)
}

impl PartialEq for TimeSeriesItem {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start
            && self.target == other.target
            && self.item == other.item
            && self.feat_static_cat == other.feat_static_cat
            && self.feat_static_real == other.feat_static_real
            && self.feat_dynamic_cat == other.feat_dynamic_cat
            && self.feat_dynamic_real == other.feat_dynamic_real
    }
}

impl TimeSeriesItem {
    /// Item with only a start and a target.
    pub fn new(start: NaiveDateTime, target: ArrayD<f32>) -> Self {
        TimeSeriesItem {
            start,
            target,
            item: None,
            feat_static_cat: Vec::new(),
            feat_static_real: Vec::new(),
            feat_dynamic_cat: Vec::new(),
            feat_dynamic_real: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Raw record holding `start`, `target`, `item` and the feature fields
    /// `metadata` declares. Undeclared features are left out.
    ///
    /// The result still has to go through a dataset to be aligned and
    /// shape-checked.
    pub fn gluontsify(&self, metadata: &MetaData) -> DataEntry {
        let mut entry = DataEntry::new()
            .with_field(
                field::START,
                Value::String(self.start.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            )
            .with_field(field::TARGET, self.target.clone());
        if let Some(item) = &self.item {
            entry.insert(field::ITEM, Value::String(item.clone()));
        }

        if !metadata.feat_static_cat.is_empty() {
            entry.insert(
                field::FEAT_STATIC_CAT,
                Array1::from(self.feat_static_cat.clone()).into_dyn(),
            );
        }
        if !metadata.feat_static_real.is_empty() {
            entry.insert(
                field::FEAT_STATIC_REAL,
                Array1::from(self.feat_static_real.clone()).into_dyn(),
            );
        }
        if !metadata.feat_dynamic_cat.is_empty() {
            entry.insert(field::FEAT_DYNAMIC_CAT, Value::from(self.feat_dynamic_cat.clone()));
        }
        if !metadata.feat_dynamic_real.is_empty() {
            entry.insert(field::FEAT_DYNAMIC_REAL, Value::from(self.feat_dynamic_real.clone()));
        }

        entry
    }
}
