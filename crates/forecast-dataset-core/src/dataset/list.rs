//! Dataset backed by records held in memory.

use log::debug;

use crate::{
    dataset::{Dataset, DatasetError, DatasetIter},
    entry::{DataEntry, IntoDataEntry, SourceContext},
    frequency::Frequency,
    process::ProcessDataEntry,
};

/// Source tag attached to every record of a [`ListDataset`].
pub const LIST_DATA_SOURCE: &str = "list_data";

/// Dataset backed directly by a list of records.
///
/// Records are processed once, at construction; a single invalid record
/// rejects the whole dataset.
#[derive(Debug, Clone)]
pub struct ListDataset {
    list_data: Vec<DataEntry>,
}

impl ListDataset {
    /// Process `data_iter` eagerly into a dataset.
    ///
    /// Fails on the first invalid record, reporting its 1-based row.
    pub fn new<I>(data_iter: I, freq: Frequency, one_dim_target: bool) -> Result<Self, DatasetError>
    where
        I: IntoIterator,
        I::Item: IntoDataEntry,
    {
        ListDataset::with_process(data_iter, &ProcessDataEntry::new(freq, one_dim_target))
    }

    /// Process `data_iter` eagerly with a caller-built record pipeline.
    pub fn with_process<I>(data_iter: I, process: &ProcessDataEntry) -> Result<Self, DatasetError>
    where
        I: IntoIterator,
        I::Item: IntoDataEntry,
    {
        let list_data = data_iter
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                process.process_raw(raw).map_err(|source| DatasetError::Data {
                    context: Some(SourceContext::new(LIST_DATA_SOURCE, i + 1)),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "built list dataset with {} record(s), freq={}",
            list_data.len(),
            process.freq()
        );

        Ok(ListDataset { list_data })
    }

    /// The processed records, without provenance.
    pub fn entries(&self) -> &[DataEntry] {
        &self.list_data
    }
}

impl Dataset for ListDataset {
    fn iter(&self) -> DatasetIter<'_> {
        Box::new(self.list_data.iter().enumerate().map(|(i, entry)| {
            Ok(entry
                .clone()
                .with_source(SourceContext::new(LIST_DATA_SOURCE, i + 1)))
        }))
    }

    fn len(&self) -> Result<usize, DatasetError> {
        Ok(self.list_data.len())
    }
}
