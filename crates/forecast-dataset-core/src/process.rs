//! The per-record validation pipeline.
//!
//! [`ProcessDataEntry`] is a fixed chain of [`EntryTransform`]s applied to
//! every raw record of a dataset:
//!
//! 1. [`ProcessStartField`] on `start`,
//! 2. [`ProcessTimeSeriesField`] on `target` (required, real),
//! 3. `feat_dynamic_cat`, `feat_dynamic_real`, `feat_static_cat`,
//!    `feat_static_real` (all optional).
//!
//! Each transform takes ownership of the entry and hands back the updated
//! one, or a [`DataError`] naming the field. The chain stops at the first
//! failure, so callers never observe a half-processed record.

pub(crate) mod array;

use std::sync::Arc;

use ndarray::{ArrayD, Axis};
use serde_json::Value;

use crate::{
    entry::{DataEntry, DataError, FieldValue, IntoDataEntry, error::describe_json, field},
    frequency::Frequency,
    timestamp::{TimestampError, TimestampNormalizer},
};

use array::{Element, json_to_array, recast_f32, recast_i32};

/// One step of the record pipeline.
pub trait EntryTransform: Send + Sync {
    /// Apply the step to `entry`.
    fn apply(&self, entry: DataEntry) -> Result<DataEntry, DataError>;
}

impl<F> EntryTransform for F
where
    F: Fn(DataEntry) -> Result<DataEntry, DataError> + Send + Sync,
{
    fn apply(&self, entry: DataEntry) -> Result<DataEntry, DataError> {
        self(entry)
    }
}

/// Normalizes a timestamp field to the dataset frequency.
pub struct ProcessStartField {
    name: String,
    freq: Frequency,
    normalizer: Arc<TimestampNormalizer>,
}

impl ProcessStartField {
    /// Normalize field `name` with the shared normalizer.
    pub fn new(name: impl Into<String>, freq: Frequency) -> Self {
        ProcessStartField::with_normalizer(name, freq, TimestampNormalizer::global())
    }

    /// Normalize field `name` with an injected normalizer.
    pub fn with_normalizer(
        name: impl Into<String>,
        freq: Frequency,
        normalizer: Arc<TimestampNormalizer>,
    ) -> Self {
        ProcessStartField {
            name: name.into(),
            freq,
            normalizer,
        }
    }
}

impl EntryTransform for ProcessStartField {
    fn apply(&self, mut entry: DataEntry) -> Result<DataEntry, DataError> {
        let normalized = match entry.get(&self.name) {
            None | Some(FieldValue::Json(Value::Null)) => {
                return Err(DataError::MissingField {
                    field: self.name.clone(),
                });
            }
            Some(FieldValue::Json(Value::String(raw))) => self.normalizer.normalize(raw, self.freq),
            Some(FieldValue::Timestamp(ts)) => self.normalizer.realign(ts.datetime(), self.freq),
            Some(FieldValue::Json(other)) => Err(TimestampError::UnsupportedType {
                found: describe_json(other),
            }),
            Some(FieldValue::Int32(_) | FieldValue::Float32(_)) => {
                Err(TimestampError::UnsupportedType {
                    found: "a numeric array".to_string(),
                })
            }
        };

        let ts = normalized.map_err(|source| match source {
            TimestampError::TimezoneNotSupported { .. } => DataError::TimezoneNotSupported {
                field: self.name.clone(),
            },
            source => DataError::InvalidTimestamp {
                field: self.name.clone(),
                source,
            },
        })?;

        entry.insert(self.name.clone(), ts);
        Ok(entry)
    }
}

/// Numeric type a field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    /// 32-bit integers, for categorical fields.
    Int32,
    /// 32-bit floats, for real-valued fields.
    Float32,
}

/// Coerces an array field to a typed array of the expected rank.
///
/// - absent or `null`: an error if required, otherwise a no-op;
/// - categorical fields become `int32`, real fields `float32`;
/// - static fields must be 1-D, dynamic fields 2-D; a 1-D value for a
///   dynamic field is promoted to shape `(1, T)`. Every other rank mismatch
///   is an error.
#[derive(Debug, Clone)]
pub struct ProcessTimeSeriesField {
    name: String,
    is_required: bool,
    req_ndim: usize,
    dtype: DType,
}

impl ProcessTimeSeriesField {
    /// Build a coercer for field `name`.
    pub fn new(name: impl Into<String>, is_required: bool, is_static: bool, is_cat: bool) -> Self {
        ProcessTimeSeriesField {
            name: name.into(),
            is_required,
            req_ndim: if is_static { 1 } else { 2 },
            dtype: if is_cat { DType::Int32 } else { DType::Float32 },
        }
    }

    /// Name of the field this coercer handles.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of dimensions the coerced array has.
    pub fn required_ndim(&self) -> usize {
        self.req_ndim
    }

    /// Element type of the coerced array.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    fn coerce<T: Element>(&self, value: &FieldValue) -> Result<ArrayD<T>, DataError> {
        let values = match value {
            FieldValue::Json(json) => json_to_array::<T>(&self.name, json)?,
            FieldValue::Float32(values) => recast_f32::<T>(&self.name, values)?,
            FieldValue::Int32(values) => recast_i32::<T>(values),
            FieldValue::Timestamp(_) => {
                return Err(DataError::InvalidValue {
                    field: self.name.clone(),
                    details: "expected an array, found a timestamp".to_string(),
                });
            }
        };
        self.check_rank(values)
    }

    fn check_rank<T>(&self, values: ArrayD<T>) -> Result<ArrayD<T>, DataError> {
        let actual = values.ndim();
        if actual == self.req_ndim {
            Ok(values)
        } else if self.req_ndim == 2 && actual == 1 {
            Ok(values.insert_axis(Axis(0)))
        } else {
            Err(DataError::BadShape {
                field: self.name.clone(),
                expected: self.req_ndim,
                actual,
            })
        }
    }
}

impl EntryTransform for ProcessTimeSeriesField {
    fn apply(&self, mut entry: DataEntry) -> Result<DataEntry, DataError> {
        let coerced = match entry.get(&self.name) {
            None | Some(FieldValue::Json(Value::Null)) => {
                if self.is_required {
                    return Err(DataError::MissingField {
                        field: self.name.clone(),
                    });
                }
                return Ok(entry);
            }
            Some(value) => match self.dtype {
                DType::Int32 => FieldValue::Int32(self.coerce::<i32>(value)?),
                DType::Float32 => FieldValue::Float32(self.coerce::<f32>(value)?),
            },
        };

        entry.insert(self.name.clone(), coerced);
        Ok(entry)
    }
}

/// The fixed record pipeline used by every dataset.
pub struct ProcessDataEntry {
    freq: Frequency,
    one_dim_target: bool,
    transforms: Vec<Box<dyn EntryTransform>>,
}

impl ProcessDataEntry {
    /// Pipeline for `freq` using the shared timestamp normalizer.
    ///
    /// With `one_dim_target`, `target` must be 1-D; otherwise it must be 2-D
    /// (a 1-D target is promoted to a single row).
    pub fn new(freq: Frequency, one_dim_target: bool) -> Self {
        ProcessDataEntry::with_normalizer(freq, one_dim_target, TimestampNormalizer::global())
    }

    /// Pipeline for `freq` with an injected timestamp normalizer.
    pub fn with_normalizer(
        freq: Frequency,
        one_dim_target: bool,
        normalizer: Arc<TimestampNormalizer>,
    ) -> Self {
        let transforms: Vec<Box<dyn EntryTransform>> = vec![
            Box::new(ProcessStartField::with_normalizer(
                field::START,
                freq,
                normalizer,
            )),
            // A univariate target takes the static (1-D) path.
            Box::new(ProcessTimeSeriesField::new(
                field::TARGET,
                true,
                one_dim_target,
                false,
            )),
            Box::new(ProcessTimeSeriesField::new(
                field::FEAT_DYNAMIC_CAT,
                false,
                false,
                true,
            )),
            Box::new(ProcessTimeSeriesField::new(
                field::FEAT_DYNAMIC_REAL,
                false,
                false,
                false,
            )),
            Box::new(ProcessTimeSeriesField::new(
                field::FEAT_STATIC_CAT,
                false,
                true,
                true,
            )),
            Box::new(ProcessTimeSeriesField::new(
                field::FEAT_STATIC_REAL,
                false,
                true,
                false,
            )),
        ];

        ProcessDataEntry {
            freq,
            one_dim_target,
            transforms,
        }
    }

    /// Frequency timestamps are aligned to.
    pub fn freq(&self) -> Frequency {
        self.freq
    }

    /// Whether targets must be univariate.
    pub fn one_dim_target(&self) -> bool {
        self.one_dim_target
    }

    /// Run `entry` through every step.
    pub fn process(&self, entry: DataEntry) -> Result<DataEntry, DataError> {
        self.transforms
            .iter()
            .try_fold(entry, |entry, transform| transform.apply(entry))
    }

    /// Convert a raw record and run it through every step.
    pub fn process_raw(&self, raw: impl IntoDataEntry) -> Result<DataEntry, DataError> {
        self.process(raw.into_data_entry()?)
    }
}

impl std::fmt::Debug for ProcessDataEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDataEntry")
            .field("freq", &self.freq)
            .field("one_dim_target", &self.one_dim_target)
            .field("steps", &self.transforms.len())
            .finish()
    }
}
