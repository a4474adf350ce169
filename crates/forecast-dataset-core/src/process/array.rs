//! Conversion of loosely-typed JSON into dense numeric arrays.
//!
//! Nested JSON arrays are flattened in row-major order after checking that
//! they form a rectangular block. Scalars become 0-D arrays; rank checks are
//! left to the caller.

use ndarray::{ArrayD, IxDyn};
use serde_json::Value;

use crate::entry::DataError;

/// Element types a field can be coerced to.
pub(crate) trait Element: Copy {
    /// Convert one JSON scalar.
    fn from_json(value: &Value) -> Result<Self, String>;
    /// Re-cast a value from an already coerced real array.
    fn from_f32(value: f32) -> Result<Self, String>;
    /// Re-cast a value from an already coerced categorical array.
    fn from_i32(value: i32) -> Self;
}

impl Element for f32 {
    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(|x| x as f32)
                .ok_or_else(|| format!("number {n} is not representable as float32")),
            Value::String(s) => s
                .trim()
                .parse::<f32>()
                .map_err(|_| format!("string '{s}' is not a number")),
            Value::Null => Ok(f32::NAN),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Array(_) | Value::Object(_) => Err("expected a number".to_string()),
        }
    }

    fn from_f32(value: f32) -> Result<Self, String> {
        Ok(value)
    }

    fn from_i32(value: i32) -> Self {
        value as f32
    }
}

impl Element for i32 {
    fn from_json(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_err(|_| format!("{i} does not fit in int32"))
                } else {
                    n.as_f64()
                        .ok_or_else(|| format!("number {n} is not representable"))
                        .and_then(truncate_to_i32)
                }
            }
            Value::String(s) => {
                let s = s.trim();
                match s.parse::<i32>() {
                    Ok(i) => Ok(i),
                    Err(_) => s
                        .parse::<f64>()
                        .map_err(|_| format!("string '{s}' is not a number"))
                        .and_then(truncate_to_i32),
                }
            }
            Value::Bool(b) => Ok(i32::from(*b)),
            Value::Null => Err("categorical values cannot be null".to_string()),
            Value::Array(_) | Value::Object(_) => Err("expected an integer".to_string()),
        }
    }

    fn from_f32(value: f32) -> Result<Self, String> {
        truncate_to_i32(f64::from(value))
    }

    fn from_i32(value: i32) -> Self {
        value
    }
}

fn truncate_to_i32(value: f64) -> Result<i32, String> {
    let truncated = value.trunc();
    if truncated.is_finite() && truncated >= f64::from(i32::MIN) && truncated <= f64::from(i32::MAX)
    {
        Ok(truncated as i32)
    } else {
        Err(format!("{value} cannot be cast to int32"))
    }
}

/// Coerce a JSON value into an array of `T`.
pub(crate) fn json_to_array<T: Element>(field: &str, value: &Value) -> Result<ArrayD<T>, DataError> {
    // The inferred shape only follows first elements, so it is not trusted
    // for sizing until `flatten` has confirmed the block is rectangular.
    let shape = infer_shape(value);
    let mut flat = Vec::new();
    flatten(field, value, &shape, 0, &mut flat)?;

    ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| DataError::RaggedArray {
        field: field.to_string(),
        details: e.to_string(),
    })
}

/// Shape implied by following the first element at every nesting level.
fn infer_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

fn flatten<T: Element>(
    field: &str,
    value: &Value,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<T>,
) -> Result<(), DataError> {
    match (value, shape.get(depth)) {
        (Value::Array(items), Some(&len)) if items.len() == len => {
            for item in items {
                flatten(field, item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        (Value::Array(items), Some(&len)) => Err(DataError::RaggedArray {
            field: field.to_string(),
            details: format!(
                "expected {len} elements at depth {depth}, found {}",
                items.len()
            ),
        }),
        (Value::Array(_), None) => Err(DataError::RaggedArray {
            field: field.to_string(),
            details: format!("unexpected nested array at depth {depth}"),
        }),
        (scalar, None) => {
            let element = T::from_json(scalar).map_err(|details| DataError::InvalidValue {
                field: field.to_string(),
                details,
            })?;
            out.push(element);
            Ok(())
        }
        (_, Some(_)) => Err(DataError::RaggedArray {
            field: field.to_string(),
            details: format!("expected an array at depth {depth}, found a scalar"),
        }),
    }
}

/// Re-cast an already coerced real array.
pub(crate) fn recast_f32<T: Element>(field: &str, values: &ArrayD<f32>) -> Result<ArrayD<T>, DataError> {
    let mut flat = Vec::with_capacity(values.len());
    for &v in values.iter() {
        let element = T::from_f32(v).map_err(|details| DataError::InvalidValue {
            field: field.to_string(),
            details,
        })?;
        flat.push(element);
    }
    ArrayD::from_shape_vec(IxDyn(values.shape()), flat).map_err(|e| DataError::RaggedArray {
        field: field.to_string(),
        details: e.to_string(),
    })
}

/// Re-cast an already coerced categorical array.
pub(crate) fn recast_i32<T: Element>(values: &ArrayD<i32>) -> ArrayD<T> {
    values.mapv(T::from_i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_and_nested_arrays() {
        let a: ArrayD<f32> = json_to_array("target", &json!([1, 2.5, 3])).unwrap();
        assert_eq!(a.shape(), &[3]);
        assert_eq!(a.as_slice().unwrap(), &[1.0, 2.5, 3.0]);

        let b: ArrayD<i32> = json_to_array("f", &json!([[1, 2], [3, 4], [5, 6]])).unwrap();
        assert_eq!(b.shape(), &[3, 2]);
        assert_eq!(b.as_slice().unwrap(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn scalars_are_zero_dimensional() {
        let a: ArrayD<f32> = json_to_array("target", &json!(4.0)).unwrap();
        assert_eq!(a.ndim(), 0);
    }

    #[test]
    fn nan_markers_and_nulls_become_nan() {
        let a: ArrayD<f32> = json_to_array("target", &json!([1.0, "NaN", null, "nan"])).unwrap();
        let v = a.as_slice().unwrap();
        assert_eq!(v[0], 1.0);
        assert!(v[1].is_nan());
        assert!(v[2].is_nan());
        assert!(v[3].is_nan());

        let inf: ArrayD<f32> = json_to_array("target", &json!(["Infinity", "-Infinity"])).unwrap();
        assert_eq!(inf.as_slice().unwrap(), &[f32::INFINITY, f32::NEG_INFINITY]);
    }

    #[test]
    fn categorical_truncates_and_parses_strings() {
        let a: ArrayD<i32> = json_to_array("cat", &json!([1.9, "3", -2.5, true])).unwrap();
        assert_eq!(a.as_slice().unwrap(), &[1, 3, -2, 1]);
    }

    #[test]
    fn categorical_rejects_null_and_overflow() {
        let err = json_to_array::<i32>("cat", &json!([1, null])).unwrap_err();
        assert!(matches!(err, DataError::InvalidValue { ref field, .. } if field == "cat"));

        let err = json_to_array::<i32>("cat", &json!([1e12])).unwrap_err();
        assert!(matches!(err, DataError::InvalidValue { .. }));
    }

    #[test]
    fn ragged_arrays_are_rejected() {
        let err = json_to_array::<f32>("feat_dynamic_real", &json!([[1, 2], [3]])).unwrap_err();
        assert!(matches!(err, DataError::RaggedArray { .. }));
        assert!(err.to_string().contains("feat_dynamic_real"));

        let err = json_to_array::<f32>("feat_dynamic_real", &json!([[1, 2], 3])).unwrap_err();
        assert!(matches!(err, DataError::RaggedArray { .. }));

        let err = json_to_array::<f32>("feat_dynamic_real", &json!([1, [2, 3]])).unwrap_err();
        assert!(matches!(err, DataError::RaggedArray { .. }));
    }

    #[test]
    fn ragged_array_with_huge_leading_shape_is_rejected() {
        // Each level is wide enough that the shape implied by the first
        // elements overflows `usize`.
        const WIDTH: usize = 70_000;
        let mut value = Value::Array(vec![json!(0); WIDTH]);
        for _ in 0..3 {
            let mut level = vec![json!(0); WIDTH];
            level[0] = value;
            value = Value::Array(level);
        }

        let err = json_to_array::<f32>("target", &value).unwrap_err();
        assert!(matches!(err, DataError::RaggedArray { ref field, .. } if field == "target"));
    }

    #[test]
    fn empty_arrays_have_zero_length() {
        let a: ArrayD<f32> = json_to_array("target", &json!([])).unwrap();
        assert_eq!(a.shape(), &[0]);
    }

    #[test]
    fn recast_between_dtypes() {
        let real: ArrayD<f32> = json_to_array("x", &json!([[1.7, 2.0]])).unwrap();
        let cat: ArrayD<i32> = recast_f32("x", &real).unwrap();
        assert_eq!(cat.shape(), &[1, 2]);
        assert_eq!(cat.as_slice().unwrap(), &[1, 2]);

        let back: ArrayD<f32> = recast_i32(&cat);
        assert_eq!(back.as_slice().unwrap(), &[1.0, 2.0]);

        let nan: ArrayD<f32> = json_to_array("x", &json!(["NaN"])).unwrap();
        assert!(recast_f32::<i32>("x", &nan).is_err());
    }
}
