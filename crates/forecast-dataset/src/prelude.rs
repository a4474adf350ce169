//! Wrapper prelude.
//!
//! The `forecast-dataset` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::field;
pub use crate::{
    Channel, DataEntry, DataError, Dataset, DatasetError, FieldValue, FileDataset, Frequency,
    IntoDataEntry, ListDataset, LoadError, MetaData, SaveError, TimeSeriesItem, TrainDatasets,
    load_datasets, save_datasets, serialize_data_entry,
};
