//! Line-delimited JSON files.
//!
//! A [`JsonLinesFile`] is a lazily read file of one JSON value per line.
//! Blank (whitespace-only) lines are skipped and do not count towards
//! [`JsonLinesFile::len`]; line numbers in [`Span`]s are the physical, 1-based
//! line numbers. A line that is not UTF-8 or not JSON is a [`DataError`] for
//! that line only; reading continues with the next one.

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    dataset::DatasetError,
    entry::{DataError, SourceContext},
    storage::{self, StorageResult, classify_io},
};

/// Location of a line inside a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// The file the line was read from.
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

impl From<&Span> for SourceContext {
    fn from(span: &Span) -> Self {
        SourceContext::new(span.path.display().to_string(), span.line)
    }
}

/// A parsed line and where it came from.
#[derive(Debug, Clone)]
pub struct JsonLine {
    /// The decoded JSON value.
    pub content: Value,
    /// Where the value was read from.
    pub span: Span,
}

/// A file of line-delimited JSON values.
#[derive(Debug, Clone)]
pub struct JsonLinesFile {
    path: PathBuf,
}

impl JsonLinesFile {
    /// Wrap the file at `path`. Nothing is opened until iteration.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonLinesFile { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and iterate over its lines.
    ///
    /// The file handle lives as long as the returned iterator.
    pub fn iter(&self) -> StorageResult<JsonLines> {
        let file = storage::open_file(&self.path)?;
        Ok(JsonLines {
            path: self.path.clone(),
            reader: BufReader::new(file),
            buf: Vec::new(),
            line_no: 0,
            finished: false,
        })
    }

    /// Number of non-blank lines. Reads the whole file.
    ///
    /// Counts exactly the lines [`JsonLinesFile::iter`] yields an item for,
    /// whether or not that item is valid.
    pub fn len(&self) -> StorageResult<usize> {
        let file = storage::open_file(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut count = 0;
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| classify_io(&self.path, e))?;
            if read == 0 {
                return Ok(count);
            }
            if !is_blank(&buf) {
                count += 1;
            }
        }
    }

    /// Whether the file has no non-blank lines.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Iterator over the lines of an open [`JsonLinesFile`].
#[derive(Debug)]
pub struct JsonLines {
    path: PathBuf,
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_no: usize,
    finished: bool,
}

impl JsonLines {
    fn data_error(&self, span: &Span, source: DataError) -> DatasetError {
        DatasetError::Data {
            context: Some(SourceContext::from(span)),
            source,
        }
    }
}

impl Iterator for JsonLines {
    type Item = Result<JsonLine, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf);
            self.line_no += 1;

            match read {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    // The reader position is unknown after a failed read.
                    self.finished = true;
                    return Some(Err(DatasetError::Storage {
                        source: classify_io(&self.path, e),
                    }));
                }
            }

            if is_blank(&self.buf) {
                continue;
            }

            let span = Span {
                path: self.path.clone(),
                line: self.line_no,
            };
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(self.data_error(&span, DataError::InvalidUtf8 { source })));
                }
            };
            return Some(match serde_json::from_str(line) {
                Ok(content) => Ok(JsonLine { content, span }),
                Err(source) => Err(self.data_error(&span, DataError::InvalidJson { source })),
            });
        }
    }
}
