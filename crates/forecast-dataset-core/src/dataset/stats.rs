//! Summary statistics over a whole dataset.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    dataset::{Dataset, DatasetError},
    entry::{DataEntry, DataError, field},
};

/// Aggregate statistics gathered in one traversal of a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatistics {
    /// Whether every observed target value is integral.
    pub integer_dataset: bool,
    /// Largest observed target value.
    pub max_target: f64,
    /// Smallest observed target value.
    pub min_target: f64,
    /// Mean of the observed target values.
    pub mean_target: f64,
    /// Mean absolute value of the observed target values.
    pub mean_abs_target: f64,
    /// Length of the longest series.
    pub max_target_length: usize,
    /// Length of the shortest series.
    pub min_target_length: usize,
    /// Average series length.
    pub mean_target_length: f64,
    /// Number of NaN target values.
    pub num_missing_values: usize,
    /// Number of target values, missing ones included.
    pub num_time_observations: usize,
    /// Number of records.
    pub num_time_series: usize,
    /// Number of static categorical features per record.
    pub num_feat_static_cat: usize,
    /// Number of static real-valued features per record.
    pub num_feat_static_real: usize,
    /// Number of dynamic categorical features per record.
    pub num_feat_dynamic_cat: usize,
    /// Number of dynamic real-valued features per record.
    pub num_feat_dynamic_real: usize,
    /// Distinct values seen for each static categorical feature.
    pub feat_static_cat: Vec<BTreeSet<i32>>,
}

#[derive(Default)]
struct Accumulator {
    integer_dataset: bool,
    max_target: f64,
    min_target: f64,
    sum_target: f64,
    sum_abs_target: f64,
    num_observed: usize,
    max_target_length: usize,
    min_target_length: usize,
    num_missing_values: usize,
    num_time_observations: usize,
    num_time_series: usize,
    num_feat_static_cat: Option<usize>,
    num_feat_static_real: Option<usize>,
    num_feat_dynamic_cat: Option<usize>,
    num_feat_dynamic_real: Option<usize>,
    feat_static_cat: Vec<BTreeSet<i32>>,
}

fn inconsistent(details: String) -> DatasetError {
    DatasetError::Data {
        context: None,
        source: DataError::InconsistentDataset { details },
    }
}

/// Record the width of a feature field, requiring it to agree across records.
fn check_count(seen: &mut Option<usize>, name: &str, count: usize) -> Result<(), DatasetError> {
    match *seen {
        None => {
            *seen = Some(count);
            Ok(())
        }
        Some(expected) if expected == count => Ok(()),
        Some(expected) => Err(inconsistent(format!(
            "found {count} `{name}` features, previous records had {expected}"
        ))),
    }
}

impl Accumulator {
    fn new() -> Self {
        Accumulator {
            integer_dataset: true,
            max_target: f64::NEG_INFINITY,
            min_target: f64::INFINITY,
            min_target_length: usize::MAX,
            ..Accumulator::default()
        }
    }

    fn observe(&mut self, entry: &DataEntry) -> Result<(), DatasetError> {
        let context = entry.source().cloned();
        let with_context = |source: DataError| DatasetError::Data {
            context: context.clone(),
            source,
        };

        let target = entry.target().ok_or_else(|| {
            with_context(DataError::MissingField {
                field: field::TARGET.to_string(),
            })
        })?;
        let length = target.shape().last().copied().unwrap_or(0);

        self.num_time_series += 1;
        self.max_target_length = self.max_target_length.max(length);
        self.min_target_length = self.min_target_length.min(length);

        for &value in target.iter() {
            self.num_time_observations += 1;
            if value.is_nan() {
                self.num_missing_values += 1;
                continue;
            }
            let value = f64::from(value);
            self.num_observed += 1;
            self.max_target = self.max_target.max(value);
            self.min_target = self.min_target.min(value);
            self.sum_target += value;
            self.sum_abs_target += value.abs();
            if value.fract() != 0.0 {
                self.integer_dataset = false;
            }
        }

        let static_cat = entry.categorical(field::FEAT_STATIC_CAT);
        check_count(
            &mut self.num_feat_static_cat,
            field::FEAT_STATIC_CAT,
            static_cat.map_or(0, |a| a.len()),
        )?;
        if let Some(values) = static_cat {
            if self.feat_static_cat.is_empty() {
                self.feat_static_cat = vec![BTreeSet::new(); values.len()];
            }
            for (seen, &value) in self.feat_static_cat.iter_mut().zip(values.iter()) {
                seen.insert(value);
            }
        }

        check_count(
            &mut self.num_feat_static_real,
            field::FEAT_STATIC_REAL,
            entry.real(field::FEAT_STATIC_REAL).map_or(0, |a| a.len()),
        )?;

        let dynamic_cat = entry
            .categorical(field::FEAT_DYNAMIC_CAT)
            .map(|a| a.shape().to_vec());
        let dynamic_real = entry
            .real(field::FEAT_DYNAMIC_REAL)
            .map(|a| a.shape().to_vec());
        for (name, shape, seen) in [
            (field::FEAT_DYNAMIC_CAT, dynamic_cat, &mut self.num_feat_dynamic_cat),
            (field::FEAT_DYNAMIC_REAL, dynamic_real, &mut self.num_feat_dynamic_real),
        ] {
            let (count, dynamic_length) = match shape.as_deref() {
                None => (0, None),
                Some(&[features, time]) => (features, Some(time)),
                Some(other) => {
                    return Err(with_context(DataError::InconsistentDataset {
                        details: format!(
                            "`{name}` must be 2-D, found {} dimensions",
                            other.len()
                        ),
                    }));
                }
            };
            check_count(seen, name, count)?;
            if let Some(time) = dynamic_length {
                if time != length {
                    return Err(with_context(DataError::InconsistentDataset {
                        details: format!(
                            "`{name}` has length {time}, but the target has length {length}"
                        ),
                    }));
                }
            }
        }

        Ok(())
    }

    fn finish(self) -> Result<DatasetStatistics, DatasetError> {
        if self.num_time_series == 0 {
            return Err(inconsistent("the dataset is empty".to_string()));
        }

        let (mean_target, mean_abs_target) = if self.num_observed == 0 {
            (f64::NAN, f64::NAN)
        } else {
            let n = self.num_observed as f64;
            (self.sum_target / n, self.sum_abs_target / n)
        };

        Ok(DatasetStatistics {
            integer_dataset: self.integer_dataset,
            max_target: self.max_target,
            min_target: self.min_target,
            mean_target,
            mean_abs_target,
            max_target_length: self.max_target_length,
            min_target_length: self.min_target_length,
            mean_target_length: self.num_time_observations as f64 / self.num_time_series as f64,
            num_missing_values: self.num_missing_values,
            num_time_observations: self.num_time_observations,
            num_time_series: self.num_time_series,
            num_feat_static_cat: self.num_feat_static_cat.unwrap_or(0),
            num_feat_static_real: self.num_feat_static_real.unwrap_or(0),
            num_feat_dynamic_cat: self.num_feat_dynamic_cat.unwrap_or(0),
            num_feat_dynamic_real: self.num_feat_dynamic_real.unwrap_or(0),
            feat_static_cat: self.feat_static_cat,
        })
    }
}

/// Compute [`DatasetStatistics`] with one full traversal of `dataset`.
///
/// Fails on the first record error, on an empty dataset, and when records
/// disagree on their feature counts or dynamic feature lengths.
pub fn calculate_dataset_statistics<D>(dataset: &D) -> Result<DatasetStatistics, DatasetError>
where
    D: Dataset + ?Sized,
{
    let mut acc = Accumulator::new();
    for entry in dataset.iter() {
        acc.observe(&entry?)?;
    }
    acc.finish()
}
