//! On-disk layout of a dataset pair.
//!
//! ```text
//! <root>/
//!   metadata/metadata.json   # MetaData, a single JSON object
//!   train/data.json          # one record per line
//!   test/data.json           # optional, same format
//! ```
//!
//! The functions here return paths relative to the dataset root; callers
//! join them with the root before doing IO.

use std::path::{Path, PathBuf};

/// Directory holding the metadata file.
pub const METADATA_DIR_NAME: &str = "metadata";

/// Name of the metadata file inside [`METADATA_DIR_NAME`].
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Directory holding the training records.
pub const TRAIN_DIR_NAME: &str = "train";

/// Directory holding the test records.
pub const TEST_DIR_NAME: &str = "test";

/// Name of the record file written inside the train/test directories.
pub const DATA_FILE_NAME: &str = "data.json";

/// Completion marker written by some producers next to the data files.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Whether `path` is a dataset file: not hidden and not a completion marker.
pub fn is_data_file(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => !(name.starts_with('.') || name == SUCCESS_MARKER),
        None => false,
    }
}

/// Relative path: `metadata/`
pub fn metadata_rel_dir() -> PathBuf {
    PathBuf::from(METADATA_DIR_NAME)
}

/// Relative path: `metadata/metadata.json`
pub fn metadata_rel_path() -> PathBuf {
    metadata_rel_dir().join(METADATA_FILE_NAME)
}

/// Relative path: `train/`
pub fn train_rel_dir() -> PathBuf {
    PathBuf::from(TRAIN_DIR_NAME)
}

/// Relative path: `test/`
pub fn test_rel_dir() -> PathBuf {
    PathBuf::from(TEST_DIR_NAME)
}

/// Relative path: `<dir>/data.json`
pub fn data_rel_path(dir: &Path) -> PathBuf {
    dir.join(DATA_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_file_filter() {
        assert!(is_data_file(Path::new("train/data.json")));
        assert!(is_data_file(Path::new("part-00000")));
        assert!(is_data_file(Path::new("x/_SUCCESS.json")));
        assert!(!is_data_file(Path::new("train/.data.json.crc")));
        assert!(!is_data_file(Path::new("train/_SUCCESS")));
    }

    #[test]
    fn relative_paths() {
        assert_eq!(metadata_rel_path(), PathBuf::from("metadata/metadata.json"));
        assert_eq!(
            data_rel_path(&train_rel_dir()),
            PathBuf::from("train/data.json")
        );
        assert_eq!(data_rel_path(&test_rel_dir()), PathBuf::from("test/data.json"));
    }
}
