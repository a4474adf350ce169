//! Datasets: re-iterable, sized collections of validated records.
//!
//! Two backings implement the [`Dataset`] trait:
//!
//! - [`FileDataset`] reads line-delimited JSON files under a directory. Every
//!   call to [`Dataset::iter`] re-reads and re-validates from disk, and
//!   invalid records surface lazily when their line is reached.
//! - [`ListDataset`] wraps records supplied in memory. They are validated
//!   eagerly at construction, which fails on the first invalid record.
//!
//! Each dataset owns one [`crate::process::ProcessDataEntry`] pipeline built
//! from its frequency and target dimensionality, and tags every yielded
//! entry with its [`SourceContext`].

pub mod file;
pub mod list;
pub mod stats;

use snafu::prelude::*;

pub use file::FileDataset;
pub use list::ListDataset;
pub use stats::{DatasetStatistics, calculate_dataset_statistics};

use crate::{
    entry::{DataEntry, DataError, SourceContext},
    storage::StorageError,
};

/// Iterator returned by [`Dataset::iter`].
pub type DatasetIter<'a> = Box<dyn Iterator<Item = Result<DataEntry, DatasetError>> + 'a>;

/// Errors surfaced while building or reading a dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatasetError {
    /// A record is invalid.
    #[snafu(display(
        "Invalid data entry{}: {source}",
        context.as_ref().map(|c| format!(" at {c}")).unwrap_or_default()
    ))]
    Data {
        /// Where the offending record came from, when known.
        context: Option<SourceContext>,
        /// What was wrong with it.
        source: DataError,
    },

    /// The dataset files could not be read.
    #[snafu(display("Storage error while reading dataset: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(backtrace)]
        source: StorageError,
    },
}

impl DatasetError {
    /// The data-validity error, if this is one.
    pub fn data_error(&self) -> Option<&DataError> {
        match self {
            DatasetError::Data { source, .. } => Some(source),
            DatasetError::Storage { .. } => None,
        }
    }

    /// Provenance of the offending record, if known.
    pub fn source_context(&self) -> Option<&SourceContext> {
        match self {
            DatasetError::Data { context, .. } => context.as_ref(),
            DatasetError::Storage { .. } => None,
        }
    }
}

impl From<StorageError> for DatasetError {
    fn from(source: StorageError) -> Self {
        DatasetError::Storage { source }
    }
}

/// A re-iterable, sized collection of validated records.
pub trait Dataset: Send + Sync {
    /// A fresh traversal over the records, in a stable order.
    fn iter(&self) -> DatasetIter<'_>;

    /// Number of records.
    fn len(&self) -> Result<usize, DatasetError>;

    /// Whether the dataset has no records.
    fn is_empty(&self) -> Result<bool, DatasetError> {
        Ok(self.len()? == 0)
    }

    /// Aggregate statistics, computed with one full traversal.
    fn calc_stats(&self) -> Result<DatasetStatistics, DatasetError> {
        calculate_dataset_statistics(self)
    }
}
