//! Dataset backed by line-delimited JSON files under a directory.

use std::{
    path::{Path, PathBuf},
    vec,
};

use log::debug;
use snafu::prelude::*;

use crate::{
    dataset::{Dataset, DatasetError, DatasetIter},
    entry::{DataEntry, IntoDataEntry, SourceContext},
    frequency::Frequency,
    jsonl::{JsonLines, JsonLinesFile},
    process::ProcessDataEntry,
    storage::{self, NoValidFilesSnafu, StorageResult, layout},
};

/// Dataset that loads JSON Lines files contained in a path.
///
/// Every file under the path is part of the dataset, except hidden files
/// (name starting with `.`) and `_SUCCESS` markers. A valid line looks like
/// `{"start": "2014-09-07", "target": [0.1, 0.2]}`.
///
/// Nothing is cached: each traversal re-discovers the files, re-reads them
/// and re-validates every record. Changing the files between traversals is
/// not guarded against.
#[derive(Debug)]
pub struct FileDataset {
    path: PathBuf,
    process: ProcessDataEntry,
}

impl FileDataset {
    /// Open the dataset at `path`.
    ///
    /// Fails if the path does not exist or holds no eligible file.
    pub fn new(path: impl Into<PathBuf>, freq: Frequency, one_dim_target: bool) -> StorageResult<Self> {
        FileDataset::with_process(path, ProcessDataEntry::new(freq, one_dim_target))
    }

    /// Open the dataset at `path` with a caller-built record pipeline.
    pub fn with_process(path: impl Into<PathBuf>, process: ProcessDataEntry) -> StorageResult<Self> {
        let dataset = FileDataset {
            path: path.into(),
            process,
        };

        let files = dataset.files()?;
        ensure!(
            !files.is_empty(),
            NoValidFilesSnafu {
                path: dataset.path.display().to_string(),
            }
        );
        debug!(
            "opened file dataset at {} with {} file(s), freq={}",
            dataset.path.display(),
            files.len(),
            dataset.process.freq()
        );

        Ok(dataset)
    }

    /// Root path of the dataset.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The files that compose the dataset, sorted by path.
    pub fn files(&self) -> StorageResult<Vec<PathBuf>> {
        storage::find_files(&self.path, FileDataset::is_valid)
    }

    /// Whether `path` is eligible to be part of a dataset.
    pub fn is_valid(path: &Path) -> bool {
        layout::is_data_file(path)
    }
}

impl Dataset for FileDataset {
    fn iter(&self) -> DatasetIter<'_> {
        match self.files() {
            Ok(files) => Box::new(FileDatasetIter {
                process: &self.process,
                files: files.into_iter(),
                current: None,
            }),
            Err(source) => Box::new(std::iter::once(Err(DatasetError::Storage { source }))),
        }
    }

    fn len(&self) -> Result<usize, DatasetError> {
        let mut total = 0;
        for path in self.files()? {
            total += JsonLinesFile::new(path).len()?;
        }
        Ok(total)
    }
}

/// Lazy traversal over the files of a [`FileDataset`].
///
/// At most one file is open at a time; it is closed when the traversal
/// moves on or the iterator is dropped.
struct FileDatasetIter<'a> {
    process: &'a ProcessDataEntry,
    files: vec::IntoIter<PathBuf>,
    current: Option<JsonLines>,
}

impl FileDatasetIter<'_> {
    fn process_line(&self, content: serde_json::Value, context: SourceContext) -> Result<DataEntry, DatasetError> {
        let processed = content
            .into_data_entry()
            .and_then(|entry| self.process.process(entry));

        match processed {
            Ok(entry) => Ok(entry.with_source(context)),
            Err(source) => Err(DatasetError::Data {
                context: Some(context),
                source,
            }),
        }
    }
}

impl Iterator for FileDatasetIter<'_> {
    type Item = Result<DataEntry, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => {
                        let context = SourceContext::from(&line.span);
                        return Some(self.process_line(line.content, context));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }

            let path = self.files.next()?;
            debug!("reading dataset file {}", path.display());
            match JsonLinesFile::new(path).iter() {
                Ok(lines) => self.current = Some(lines),
                Err(source) => return Some(Err(DatasetError::Storage { source })),
            }
        }
    }
}
