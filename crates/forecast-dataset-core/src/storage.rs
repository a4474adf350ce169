//! Local filesystem helpers.
//!
//! This module centralizes the filesystem access of the crate so that the
//! dataset and loader layers work with typed errors instead of bare
//! `io::Error`s:
//!
//! - discovering dataset files under a directory ([`find_files`]),
//! - reading small files ([`read_to_string`]) and opening line files
//!   ([`open_file`]),
//! - create-new semantics for the directories and files written by
//!   [`crate::loader::save_datasets`] ([`create_new_dir`],
//!   [`create_new_file`]),
//! - removing a previous dataset tree ([`remove_dir_all_if_exists`]).
//!
//! All operations are blocking. Path conventions for a dataset pair live in
//! [`layout`].

pub mod layout;

use std::{
    error::Error,
    fmt,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use snafu::{Backtrace, prelude::*};

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by the storage backend implementation.
///
/// Only the local filesystem is supported; its I/O errors are wrapped here so
/// that [`StorageError`] variants can add path context on top.
#[derive(Debug)]
pub enum BackendError {
    /// A local filesystem I/O error.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "local I/O error: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// The specified path was not found.
    #[snafu(display("Path not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying backend error that caused the failure.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The specified path already exists when creation was requested with
    /// create-new semantics.
    #[snafu(display("Path already exists: {path}"))]
    AlreadyExists {
        /// The path that was found to already exist.
        path: String,
        /// Underlying backend error that indicates the existing resource.
        source: BackendError,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },

    /// An I/O error occurred on the local filesystem.
    #[snafu(display("Local I/O error at {path}: {source}"))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying backend I/O error with platform-specific details.
        source: BackendError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A dataset directory contains no eligible files.
    #[snafu(display("no valid file found in {path}"))]
    NoValidFiles {
        /// The directory that was scanned.
        path: String,
        /// The backtrace captured when the error occurred.
        backtrace: Backtrace,
    },
}

/// Map an `io::Error` at `path` to the matching [`StorageError`] variant.
pub(crate) fn classify_io(path: &Path, e: io::Error) -> StorageError {
    let path = path.display().to_string();
    let kind = e.kind();
    let source = BackendError::Local(e);
    match kind {
        io::ErrorKind::NotFound => StorageError::NotFound {
            path,
            source,
            backtrace: Backtrace::capture(),
        },
        io::ErrorKind::AlreadyExists => StorageError::AlreadyExists {
            path,
            source,
            backtrace: Backtrace::capture(),
        },
        _ => StorageError::OtherIo {
            path,
            source,
            backtrace: Backtrace::capture(),
        },
    }
}

/// Read the file at `path` into a `String`.
///
/// A missing file yields [`StorageError::NotFound`]; any other problem
/// yields [`StorageError::OtherIo`].
pub fn read_to_string(path: &Path) -> StorageResult<String> {
    fs::read_to_string(path).map_err(|e| classify_io(path, e))
}

/// Open the file at `path` for reading.
pub fn open_file(path: &Path) -> StorageResult<File> {
    File::open(path).map_err(|e| classify_io(path, e))
}

/// Create the directory `path`, failing with [`StorageError::AlreadyExists`]
/// if it already exists. Missing parents are created.
pub fn create_new_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    fs::create_dir(path).map_err(|e| classify_io(path, e))
}

/// Create a *new* file at `path`, failing if it already exists.
pub fn create_new_file(path: &Path) -> StorageResult<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| classify_io(path, e))
}

/// Recursively delete `path`. Returns whether anything was removed; a
/// missing path is not an error.
pub fn remove_dir_all_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(classify_io(path, e)),
    }
}

/// List the files under `root` accepted by `predicate`, sorted by path.
///
/// Directories are walked recursively, hidden ones included; filtering is
/// left to `predicate`. If `root` is itself a file, it is the only candidate.
pub fn find_files<P>(root: &Path, predicate: P) -> StorageResult<Vec<PathBuf>>
where
    P: Fn(&Path) -> bool,
{
    let meta = fs::metadata(root).map_err(|e| classify_io(root, e))?;
    let mut files = Vec::new();

    if meta.is_file() {
        if predicate(root) {
            files.push(root.to_path_buf());
        }
        return Ok(files);
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| classify_io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| classify_io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| classify_io(&path, e))?;

            if file_type.is_dir() {
                pending.push(path);
            } else if path.is_file() && predicate(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
