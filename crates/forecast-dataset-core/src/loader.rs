//! Loading and saving a dataset pair: metadata, train and optional test.
//!
//! The directory layout is described in [`crate::storage::layout`]. Loaded
//! datasets are file-backed and univariate; saving accepts any [`Dataset`]
//! and writes one serialized record per line.

use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::{
    dataset::{Dataset, DatasetError, FileDataset},
    frequency::ParseFrequencyError,
    metadata::MetaData,
    serialize::serialize_data_entry,
    storage::{self, StorageError, classify_io, layout},
};

/// Errors returned by [`load_datasets`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    /// The metadata file or a dataset directory could not be read.
    #[snafu(display("Storage error while loading datasets: {source}"))]
    LoadStorage {
        /// Underlying storage error.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// The metadata file is not valid metadata JSON.
    #[snafu(display("Invalid metadata in {path}: {source}"))]
    ParseMetadata {
        /// The metadata file.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The metadata frequency is not a supported frequency string.
    #[snafu(display("Invalid frequency in metadata: {source}"))]
    MetadataFrequency {
        /// Underlying parse error.
        source: ParseFrequencyError,
    },
}

/// Errors returned by [`save_datasets`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SaveError {
    /// A directory or file could not be created or written.
    #[snafu(display("Storage error while saving datasets: {source}"))]
    SaveStorage {
        /// Underlying storage error.
        #[snafu(backtrace)]
        source: StorageError,
    },

    /// A value could not be encoded as JSON.
    #[snafu(display("Failed to write JSON to {path}: {source}"))]
    WriteJson {
        /// The file being written.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Reading a dataset being saved failed.
    #[snafu(display("Failed to read dataset while saving: {source}"))]
    ReadDataset {
        /// Underlying dataset error.
        source: DatasetError,
    },
}

/// Metadata plus a train dataset and an optional test dataset.
pub struct TrainDatasets {
    /// Dataset-level metadata.
    pub metadata: MetaData,
    /// Records for training.
    pub train: Box<dyn Dataset>,
    /// Records for evaluation.
    pub test: Option<Box<dyn Dataset>>,
}

/// Where the parts of a dataset pair live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Directory containing `metadata.json`.
    pub metadata: PathBuf,
    /// Train records.
    pub train: PathBuf,
    /// Test records.
    #[serde(default)]
    pub test: Option<PathBuf>,
}

impl Channel {
    /// Channel for the standard layout under `root`.
    pub fn from_root(root: &Path, with_test: bool) -> Self {
        Channel {
            metadata: root.join(layout::metadata_rel_dir()),
            train: root.join(layout::train_rel_dir()),
            test: with_test.then(|| root.join(layout::test_rel_dir())),
        }
    }

    /// Load the datasets this channel points at.
    pub fn get_datasets(&self) -> Result<TrainDatasets, LoadError> {
        load_datasets(&self.metadata, &self.train, self.test.as_deref())
    }
}

/// Load a dataset pair.
///
/// Reads `metadata_dir/metadata.json` and opens univariate file datasets
/// over `train_dir` and, if given, `test_dir`.
pub fn load_datasets(
    metadata_dir: &Path,
    train_dir: &Path,
    test_dir: Option<&Path>,
) -> Result<TrainDatasets, LoadError> {
    let metadata_path = metadata_dir.join(layout::METADATA_FILE_NAME);
    let text = storage::read_to_string(&metadata_path).context(LoadStorageSnafu)?;
    let metadata: MetaData = serde_json::from_str(&text).context(ParseMetadataSnafu {
        path: metadata_path.display().to_string(),
    })?;
    let freq = metadata.frequency().context(MetadataFrequencySnafu)?;

    let train = FileDataset::new(train_dir, freq, true).context(LoadStorageSnafu)?;
    let test = match test_dir {
        Some(dir) => Some(FileDataset::new(dir, freq, true).context(LoadStorageSnafu)?),
        None => None,
    };

    info!(
        "loaded datasets: freq={freq}, train={}, test={}",
        train_dir.display(),
        test_dir.map_or_else(|| "<none>".to_string(), |p| p.display().to_string())
    );

    Ok(TrainDatasets {
        metadata,
        train: Box::new(train),
        test: test.map(|ds| Box::new(ds) as Box<dyn Dataset>),
    })
}

/// Save a dataset pair under `path` in the standard layout.
///
/// With `overwrite`, anything at `path` is removed first. Directories and
/// files are created with create-new semantics, so saving over an existing
/// layout without `overwrite` fails. Writing stops at the first record that
/// cannot be read; files written up to that point are left in place.
pub fn save_datasets(datasets: &TrainDatasets, path: &Path, overwrite: bool) -> Result<(), SaveError> {
    if overwrite && storage::remove_dir_all_if_exists(path).context(SaveStorageSnafu)? {
        warn!("removed existing dataset directory {}", path.display());
    }

    storage::create_new_dir(&path.join(layout::metadata_rel_dir())).context(SaveStorageSnafu)?;
    let metadata_path = path.join(layout::metadata_rel_path());
    let mut writer = new_writer(&metadata_path)?;
    write_line(&mut writer, &metadata_path, &datasets.metadata)?;
    finish(writer, &metadata_path)?;

    let train_rows = write_dataset(datasets.train.as_ref(), &path.join(layout::train_rel_dir()))?;
    let test_rows = match &datasets.test {
        Some(test) => Some(write_dataset(test.as_ref(), &path.join(layout::test_rel_dir()))?),
        None => None,
    };

    info!(
        "saved datasets to {}: train={train_rows} record(s), test={}",
        path.display(),
        test_rows.map_or_else(|| "<none>".to_string(), |n| format!("{n} record(s)"))
    );
    Ok(())
}

fn write_dataset(dataset: &dyn Dataset, dir: &Path) -> Result<usize, SaveError> {
    storage::create_new_dir(dir).context(SaveStorageSnafu)?;
    let data_path = layout::data_rel_path(dir);
    let mut writer = new_writer(&data_path)?;

    let mut rows = 0;
    for entry in dataset.iter() {
        let entry = entry.context(ReadDatasetSnafu)?;
        write_line(&mut writer, &data_path, &serialize_data_entry(&entry))?;
        rows += 1;
    }

    finish(writer, &data_path)?;
    Ok(rows)
}

fn new_writer(path: &Path) -> Result<BufWriter<std::fs::File>, SaveError> {
    let file = storage::create_new_file(path).context(SaveStorageSnafu)?;
    Ok(BufWriter::new(file))
}

fn write_line<W, T>(writer: &mut W, path: &Path, value: &T) -> Result<(), SaveError>
where
    W: Write,
    T: Serialize + ?Sized,
{
    serde_json::to_writer(&mut *writer, value).context(WriteJsonSnafu {
        path: path.display().to_string(),
    })?;
    writer
        .write_all(b"\n")
        .map_err(|e| classify_io(path, e))
        .context(SaveStorageSnafu)
}

fn finish(mut writer: BufWriter<std::fs::File>, path: &Path) -> Result<(), SaveError> {
    writer
        .flush()
        .map_err(|e| classify_io(path, e))
        .context(SaveStorageSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ListDataset;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn sample(with_test: bool) -> Result<TrainDatasets, Box<dyn std::error::Error>> {
        let freq = "D".parse()?;
        let train = ListDataset::new(
            vec![
                json!({"start": "2021-01-01", "target": [1, 2, 3], "item": "a"}),
                json!({"start": "2021-01-05", "target": [4.5, "NaN"]}),
            ],
            freq,
            true,
        )?;
        let test = ListDataset::new(
            vec![json!({"start": "2021-01-01", "target": [1, 2, 3, 4]})],
            freq,
            true,
        )?;
        Ok(TrainDatasets {
            metadata: MetaData::new("D"),
            train: Box::new(train),
            test: with_test.then(|| Box::new(test) as Box<dyn Dataset>),
        })
    }

    #[test]
    fn writes_standard_layout() -> TestResult {
        let tmp = TempDir::new()?;
        let root = tmp.path().join("ds");
        save_datasets(&sample(true)?, &root, true)?;

        let metadata = fs::read_to_string(root.join("metadata/metadata.json"))?;
        assert!(metadata.ends_with('\n'));
        assert_eq!(metadata.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&metadata)?;
        assert_eq!(value["time_granularity"], "D");

        let train = fs::read_to_string(root.join("train/data.json"))?;
        let lines: Vec<_> = train.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(lines[1])?,
            json!({"start": "2021-01-05 00:00:00", "target": [4.5, "NaN"]})
        );
        assert!(root.join("test/data.json").is_file());
        Ok(())
    }

    #[test]
    fn refuses_existing_layout_without_overwrite() -> TestResult {
        let tmp = TempDir::new()?;
        let root = tmp.path().join("ds");
        save_datasets(&sample(false)?, &root, false)?;

        let err = save_datasets(&sample(false)?, &root, false).expect_err("metadata dir exists");
        assert!(matches!(
            err,
            SaveError::SaveStorage {
                source: StorageError::AlreadyExists { .. }
            }
        ));

        save_datasets(&sample(false)?, &root, true)?;
        assert!(!root.join("test").exists());
        Ok(())
    }

    #[test]
    fn load_reads_what_save_wrote() -> TestResult {
        let tmp = TempDir::new()?;
        let root = tmp.path().join("ds");
        save_datasets(&sample(true)?, &root, true)?;

        let loaded = Channel::from_root(&root, true).get_datasets()?;
        assert_eq!(loaded.metadata, MetaData::new("D"));
        assert_eq!(loaded.train.len()?, 2);
        assert_eq!(loaded.test.as_ref().map(|t| t.len().ok()), Some(Some(1)));
        Ok(())
    }

    #[test]
    fn load_reports_missing_metadata_and_bad_frequency() -> TestResult {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        fs::create_dir_all(root.join("metadata"))?;
        fs::create_dir_all(root.join("train"))?;
        fs::write(root.join("train/data.json"), "{\"start\": \"2021-01-01\", \"target\": [1]}\n")?;

        let err = load_datasets(&root.join("metadata"), &root.join("train"), None)
            .err()
            .expect("no metadata file");
        assert!(matches!(
            err,
            LoadError::LoadStorage {
                source: StorageError::NotFound { .. }
            }
        ));

        fs::write(root.join("metadata/metadata.json"), "{\"time_granularity\": \"fortnight\"}\n")?;
        let err = load_datasets(&root.join("metadata"), &root.join("train"), None)
            .err()
            .expect("bad frequency");
        assert!(matches!(err, LoadError::MetadataFrequency { .. }));

        fs::write(root.join("metadata/metadata.json"), "not json")?;
        let err = load_datasets(&root.join("metadata"), &root.join("train"), None)
            .err()
            .expect("bad json");
        assert!(matches!(err, LoadError::ParseMetadata { .. }));
        Ok(())
    }
}
