//! # forecast-dataset
//!
//! Line-delimited JSON time-series datasets for forecasting workloads.
//!
//! This crate is the supported public entry point and provides a small, stable surface
//! over `forecast-dataset-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use forecast_dataset::prelude::*;
//!
//! let datasets = load_datasets(&root.join("metadata"), &root.join("train"), None)?;
//! for entry in datasets.train.iter() {
//!     let entry = entry?;
//!     println!("{:?}", entry.start());
//! }
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Field name constants for records.
pub mod field {
    pub use forecast_dataset_core::entry::field::*;
}

/// On-disk layout of a saved dataset pair.
pub mod layout {
    pub use forecast_dataset_core::storage::layout::*;
}

pub use forecast_dataset_core::dataset::{
    Dataset, DatasetError, DatasetIter, DatasetStatistics, FileDataset, ListDataset,
    calculate_dataset_statistics,
};
pub use forecast_dataset_core::entry::{
    DataEntry, DataError, FieldValue, IntoDataEntry, SourceContext, TimeSeriesItem,
};
pub use forecast_dataset_core::frequency::{Frequency, FrequencyUnit, ParseFrequencyError};
pub use forecast_dataset_core::loader::{
    Channel, LoadError, SaveError, TrainDatasets, load_datasets, save_datasets,
};
pub use forecast_dataset_core::metadata::{BasicFeatureInfo, CategoricalFeatureInfo, MetaData};
pub use forecast_dataset_core::process::ProcessDataEntry;
pub use forecast_dataset_core::serialize::serialize_data_entry;
pub use forecast_dataset_core::storage::StorageError;
pub use forecast_dataset_core::timestamp::{Timestamp, TimestampError, TimestampNormalizer};
