//! Persisted description of a dataset pair.
//!
//! [`MetaData`] is stored as `metadata/metadata.json` next to the train and
//! test records. Its frequency is written under `time_granularity`; `freq`
//! is accepted when reading.

use serde::{Deserialize, Deserializer, Serialize};

use crate::frequency::{Frequency, ParseFrequencyError};

/// A named feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicFeatureInfo {
    /// Feature name.
    pub name: String,
}

/// A named categorical feature and its number of categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalFeatureInfo {
    /// Feature name.
    pub name: String,
    /// Number of categories, kept as text. Integers are accepted on input.
    #[serde(deserialize_with = "cardinality_from_json")]
    pub cardinality: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cardinality {
    Text(String),
    Number(u64),
}

fn cardinality_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Cardinality::deserialize(deserializer)? {
        Cardinality::Text(s) => s,
        Cardinality::Number(n) => n.to_string(),
    })
}

/// Dataset-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    /// Frequency string, e.g. `"H"` or `"W-SUN"`.
    #[serde(rename = "time_granularity", alias = "freq")]
    pub freq: String,
    /// Description of the target.
    #[serde(default)]
    pub target: Option<BasicFeatureInfo>,

    /// Static categorical features.
    #[serde(default)]
    pub feat_static_cat: Vec<CategoricalFeatureInfo>,
    /// Static real-valued features.
    #[serde(default)]
    pub feat_static_real: Vec<BasicFeatureInfo>,
    /// Dynamic real-valued features.
    #[serde(default)]
    pub feat_dynamic_real: Vec<BasicFeatureInfo>,
    /// Dynamic categorical features.
    #[serde(default)]
    pub feat_dynamic_cat: Vec<CategoricalFeatureInfo>,

    /// Forecast horizon the dataset was prepared for.
    #[serde(default)]
    pub prediction_length: Option<u32>,
}

impl MetaData {
    /// Metadata with only a frequency.
    pub fn new(freq: impl Into<String>) -> Self {
        MetaData {
            freq: freq.into(),
            target: None,
            feat_static_cat: Vec::new(),
            feat_static_real: Vec::new(),
            feat_dynamic_real: Vec::new(),
            feat_dynamic_cat: Vec::new(),
            prediction_length: None,
        }
    }

    /// Parse [`MetaData::freq`].
    pub fn frequency(&self) -> Result<Frequency, ParseFrequencyError> {
        self.freq.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn reads_minimal_metadata_with_defaults() -> TestResult {
        let md: MetaData = serde_json::from_value(json!({"time_granularity": "H"}))?;
        assert_eq!(md, MetaData::new("H"));
        assert_eq!(md.frequency()?, "H".parse()?);
        Ok(())
    }

    #[test]
    fn accepts_freq_alias_and_numeric_cardinality() -> TestResult {
        let md: MetaData = serde_json::from_value(json!({
            "freq": "W-SUN",
            "target": {"name": "sales"},
            "feat_static_cat": [
                {"name": "store", "cardinality": 12},
                {"name": "region", "cardinality": "3"}
            ],
            "prediction_length": 7
        }))?;

        assert_eq!(md.freq, "W-SUN");
        assert_eq!(md.feat_static_cat[0].cardinality, "12");
        assert_eq!(md.feat_static_cat[1].cardinality, "3");
        assert_eq!(md.prediction_length, Some(7));

        let out = serde_json::to_value(&md)?;
        assert_eq!(out["time_granularity"], "W-SUN");
        assert!(out.get("freq").is_none());
        assert_eq!(out["feat_static_cat"][0]["cardinality"], "12");
        Ok(())
    }

    #[test]
    fn missing_frequency_is_rejected() {
        let res: Result<MetaData, _> = serde_json::from_value(json!({"prediction_length": 3}));
        assert!(res.is_err());
    }

    #[test]
    fn bad_frequency_fails_to_parse() {
        assert!(MetaData::new("fortnightly").frequency().is_err());
    }
}
