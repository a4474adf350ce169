//! Conversion of processed records back into JSON.
//!
//! The output is what [`crate::loader::save_datasets`] writes, one object
//! per line, and it is accepted again by the record processor:
//!
//! - arrays become nested lists,
//! - NaN becomes the string [`NAN_MARKER`] and infinities become
//!   `"Infinity"`/`"-Infinity"`,
//! - timestamps become `YYYY-MM-DD HH:MM:SS[.fff]` strings.

use ndarray::{ArrayD, ArrayViewD, Axis};
use serde_json::{Map, Number, Value};

use crate::entry::{DataEntry, FieldValue};

/// String written in place of NaN values.
pub const NAN_MARKER: &str = "NaN";

const POS_INF_MARKER: &str = "Infinity";
const NEG_INF_MARKER: &str = "-Infinity";

/// Serialize `entry` into a JSON object.
///
/// `null` fields are dropped and provenance is never written.
pub fn serialize_data_entry(entry: &DataEntry) -> Map<String, Value> {
    entry
        .fields()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name.to_string(), encode_field(value)))
        .collect()
}

fn encode_field(value: &FieldValue) -> Value {
    match value {
        FieldValue::Timestamp(ts) => Value::String(ts.to_string()),
        FieldValue::Int32(values) => encode_array(values.view(), &|v: &i32| Value::from(*v)),
        FieldValue::Float32(values) => encode_real_array(values),
        FieldValue::Json(value) => value.clone(),
    }
}

/// Encode a real-valued array as nested lists with the non-finite markers.
pub(crate) fn encode_real_array(values: &ArrayD<f32>) -> Value {
    encode_array(values.view(), &encode_f32)
}

fn encode_array<T>(values: ArrayViewD<'_, T>, encode: &dyn Fn(&T) -> Value) -> Value {
    match values.ndim() {
        0 => values.iter().next().map_or(Value::Null, encode),
        1 => Value::Array(values.iter().map(encode).collect()),
        _ => Value::Array(
            values
                .axis_iter(Axis(0))
                .map(|row| encode_array(row, encode))
                .collect(),
        ),
    }
}

fn encode_f32(value: &f32) -> Value {
    let value = *value;
    if value.is_nan() {
        return Value::String(NAN_MARKER.to_string());
    }
    if value.is_infinite() {
        let marker = if value > 0.0 { POS_INF_MARKER } else { NEG_INF_MARKER };
        return Value::String(marker.to_string());
    }

    // Go through the shortest f32 rendering so that 0.1f32 is written as 0.1.
    let shortest = value.to_string().parse::<f64>().unwrap_or(f64::from(value));
    Number::from_f64(shortest).map_or(Value::Null, Value::Number)
}
