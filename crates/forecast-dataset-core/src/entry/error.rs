//! The data-validity error raised by the record pipeline.
//!
//! Every problem with the *content* of a record (missing fields, bad shapes,
//! unparseable values or timestamps, malformed JSON lines) is reported as a
//! [`DataError`]. Messages always name the offending field. I/O problems are
//! reported separately through [`crate::storage::StorageError`].

use snafu::prelude::*;

use crate::timestamp::TimestampError;

/// A data-validity fault in a single record or dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DataError {
    /// A required field is absent (or `null`).
    #[snafu(display("JSON object is missing a required field `{field}`"))]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// An array field has the wrong number of dimensions.
    #[snafu(display(
        "JSON array has bad shape in field `{field}` - expected {expected} dimensions, got {actual}"
    ))]
    BadShape {
        /// Name of the offending field.
        field: String,
        /// Number of dimensions the field requires.
        expected: usize,
        /// Number of dimensions that were supplied.
        actual: usize,
    },

    /// Nested arrays in a field do not form a rectangular block.
    #[snafu(display("JSON array in field `{field}` is ragged: {details}"))]
    RaggedArray {
        /// Name of the offending field.
        field: String,
        /// Where the irregularity was found.
        details: String,
    },

    /// An element could not be converted to the field's numeric type.
    #[snafu(display("Invalid value in field `{field}`: {details}"))]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// What was wrong with the value.
        details: String,
    },

    /// The field could not be read as a timestamp.
    #[snafu(display("Error \"{source}\" occurred, when reading field `{field}`"))]
    InvalidTimestamp {
        /// Name of the timestamp field.
        field: String,
        /// Underlying parse failure.
        source: TimestampError,
    },

    /// The timestamp field carries timezone information.
    #[snafu(display(
        "Timezone information is not supported, but provided in the `{field}` field"
    ))]
    TimezoneNotSupported {
        /// Name of the timestamp field.
        field: String,
    },

    /// A line of input is not valid JSON.
    #[snafu(display("Invalid JSON record: {source}"))]
    InvalidJson {
        /// Underlying JSON parse error.
        source: serde_json::Error,
    },

    /// A line of input is not valid UTF-8.
    #[snafu(display("Record is not valid UTF-8: {source}"))]
    InvalidUtf8 {
        /// Underlying decoding error.
        source: std::str::Utf8Error,
    },

    /// A record is valid JSON but not a JSON object.
    #[snafu(display("Expected a JSON object per record, found {found}"))]
    NotAnObject {
        /// Short description of the value that was found.
        found: String,
    },

    /// Records in a dataset disagree with each other, or the dataset is
    /// unusable as a whole.
    #[snafu(display("Inconsistent dataset: {details}"))]
    InconsistentDataset {
        /// What was inconsistent.
        details: String,
    },
}

/// Short, content-free description of a JSON value's kind for error messages.
pub(crate) fn describe_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(_) => "a boolean".to_string(),
        serde_json::Value::Number(_) => "a number".to_string(),
        serde_json::Value::String(_) => "a string".to_string(),
        serde_json::Value::Array(a) => format!("an array of length {}", a.len()),
        serde_json::Value::Object(_) => "an object".to_string(),
    }
}
