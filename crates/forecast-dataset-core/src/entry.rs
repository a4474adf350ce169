//! Records flowing through the ingestion pipeline.
//!
//! A [`DataEntry`] is a mapping from field name to [`FieldValue`]. Raw
//! records start out with every field as [`FieldValue::Json`]; the record
//! processor replaces the recognized fields with typed values:
//!
//! - `start` becomes a [`FieldValue::Timestamp`],
//! - `target`, `feat_static_real`, `feat_dynamic_real` become
//!   [`FieldValue::Float32`] arrays,
//! - `feat_static_cat`, `feat_dynamic_cat` become [`FieldValue::Int32`] arrays.
//!
//! Every other key (`item`, `metadata`, anything unrecognized) stays JSON.
//! Provenance ([`SourceContext`]) is kept next to the fields rather than in
//! them, so it is never serialized.

pub mod error;
pub mod item;

use std::{collections::BTreeMap, fmt};

use ndarray::ArrayD;
use serde_json::{Map, Value};

pub use error::DataError;
pub use item::TimeSeriesItem;

use crate::timestamp::Timestamp;

/// Well-known field names.
pub mod field {
    /// Start timestamp of the series.
    pub const START: &str = "start";
    /// Target values, `(T,)` or `(D, T)`.
    pub const TARGET: &str = "target";
    /// Series identifier.
    pub const ITEM: &str = "item";
    /// Static categorical features, `(F,)`.
    pub const FEAT_STATIC_CAT: &str = "feat_static_cat";
    /// Static real-valued features, `(F,)`.
    pub const FEAT_STATIC_REAL: &str = "feat_static_real";
    /// Dynamic categorical features, `(F, T)`.
    pub const FEAT_DYNAMIC_CAT: &str = "feat_dynamic_cat";
    /// Dynamic real-valued features, `(F, T)`.
    pub const FEAT_DYNAMIC_REAL: &str = "feat_dynamic_real";
    /// Free-form diagnostics.
    pub const METADATA: &str = "metadata";
}

/// Where a record came from: a source identifier and a 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceContext {
    /// File path or in-memory source tag.
    pub source: String,
    /// 1-based line or row number within the source.
    pub row: usize,
}

impl SourceContext {
    /// Build a source context.
    pub fn new(source: impl Into<String>, row: usize) -> Self {
        SourceContext {
            source: source.into(),
            row,
        }
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.row)
    }
}

/// Value of a single field of a [`DataEntry`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A normalized timestamp.
    Timestamp(Timestamp),
    /// A categorical array.
    Int32(ArrayD<i32>),
    /// A real-valued array.
    Float32(ArrayD<f32>),
    /// An untyped value, as read from the input.
    Json(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(ts: Timestamp) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<ArrayD<i32>> for FieldValue {
    fn from(values: ArrayD<i32>) -> Self {
        FieldValue::Int32(values)
    }
}

impl From<ArrayD<f32>> for FieldValue {
    fn from(values: ArrayD<f32>) -> Self {
        FieldValue::Float32(values)
    }
}

impl FieldValue {
    /// Whether this is a JSON `null`, which counts as an absent field.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Json(Value::Null))
    }
}

/// One time series record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataEntry {
    fields: BTreeMap<String, FieldValue>,
    source: Option<SourceContext>,
}

impl DataEntry {
    /// An entry with no fields.
    pub fn new() -> Self {
        DataEntry::default()
    }

    /// Builder-style [`DataEntry::insert`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style [`DataEntry::set_source`].
    pub fn with_source(mut self, source: SourceContext) -> Self {
        self.source = Some(source);
        self
    }

    /// Set a field, returning its previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Whether the field is present and not `null`.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }

    /// Iterate over `(name, value)` pairs in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the entry has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Provenance attached when the entry was yielded by a dataset.
    pub fn source(&self) -> Option<&SourceContext> {
        self.source.as_ref()
    }

    /// Attach provenance.
    pub fn set_source(&mut self, source: SourceContext) {
        self.source = Some(source);
    }

    /// The normalized `start` timestamp, once processed.
    pub fn start(&self) -> Option<&Timestamp> {
        match self.get(field::START) {
            Some(FieldValue::Timestamp(ts)) => Some(ts),
            _ => None,
        }
    }

    /// The `target` array, once processed.
    pub fn target(&self) -> Option<&ArrayD<f32>> {
        self.real(field::TARGET)
    }

    /// A processed real-valued array field.
    pub fn real(&self, name: &str) -> Option<&ArrayD<f32>> {
        match self.get(name) {
            Some(FieldValue::Float32(values)) => Some(values),
            _ => None,
        }
    }

    /// A processed categorical array field.
    pub fn categorical(&self, name: &str) -> Option<&ArrayD<i32>> {
        match self.get(name) {
            Some(FieldValue::Int32(values)) => Some(values),
            _ => None,
        }
    }

    /// The `item` identifier, if it is a string.
    pub fn item(&self) -> Option<&str> {
        match self.get(field::ITEM) {
            Some(FieldValue::Json(Value::String(s))) => Some(s),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for DataEntry {
    fn from(map: Map<String, Value>) -> Self {
        DataEntry {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, FieldValue::Json(v)))
                .collect(),
            source: None,
        }
    }
}

/// Conversion of a raw record into a [`DataEntry`].
///
/// Implemented for JSON values (which must be objects), JSON objects and
/// entries themselves, so datasets can be built from any of them.
pub trait IntoDataEntry {
    /// Convert into an entry, failing if the value is not a record.
    fn into_data_entry(self) -> Result<DataEntry, DataError>;
}

impl IntoDataEntry for DataEntry {
    fn into_data_entry(self) -> Result<DataEntry, DataError> {
        Ok(self)
    }
}

impl IntoDataEntry for Map<String, Value> {
    fn into_data_entry(self) -> Result<DataEntry, DataError> {
        Ok(DataEntry::from(self))
    }
}

impl IntoDataEntry for Value {
    fn into_data_entry(self) -> Result<DataEntry, DataError> {
        match self {
            Value::Object(map) => Ok(DataEntry::from(map)),
            other => Err(DataError::NotAnObject {
                found: error::describe_json(&other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;
    use serde_json::json;

    #[test]
    fn raw_objects_become_json_fields() {
        let entry = json!({"start": "2014-09-07", "target": [1, 2], "item": "a"})
            .into_data_entry()
            .unwrap();

        assert_eq!(entry.len(), 3);
        assert_eq!(entry.item(), Some("a"));
        assert_eq!(
            entry.get(field::START),
            Some(&FieldValue::Json(json!("2014-09-07")))
        );
        // Not processed yet.
        assert!(entry.start().is_none());
        assert!(entry.target().is_none());
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = json!([1, 2, 3]).into_data_entry().unwrap_err();
        assert!(matches!(err, DataError::NotAnObject { .. }));
        assert!(err.to_string().contains("an array of length 3"));
    }

    #[test]
    fn null_counts_as_absent() {
        let entry = DataEntry::new()
            .with_field("feat_static_cat", Value::Null)
            .with_field(field::TARGET, arr1(&[1.0f32, 2.0]).into_dyn());

        assert!(!entry.contains(field::FEAT_STATIC_CAT));
        assert!(entry.contains(field::TARGET));
        assert_eq!(entry.target().map(|t| t.len()), Some(2));
    }

    #[test]
    fn source_context_displays_as_location() {
        let ctx = SourceContext::new("data/train.json", 12);
        assert_eq!(ctx.to_string(), "data/train.json:12");

        let entry = DataEntry::new().with_source(ctx.clone());
        assert_eq!(entry.source(), Some(&ctx));
    }
}
