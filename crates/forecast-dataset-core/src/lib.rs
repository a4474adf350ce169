//! Core ingestion layer for time-series forecasting datasets.
//!
//! Records are JSON objects with a `start` timestamp, a numeric `target`
//! and optional covariates. This crate turns them into validated,
//! consistently typed [`entry::DataEntry`] values:
//!
//! - Frequencies (`H`, `15min`, `W-SUN`, `M`, ...) and timestamp
//!   normalization onto the frequency grid, memoized in a bounded LRU cache
//!   (`frequency`, `timestamp` modules).
//! - A fixed record pipeline that parses `start` and coerces every array
//!   field to the right element type and rank (`process` module).
//! - Re-iterable datasets backed by line-delimited JSON files or by
//!   in-memory records (`dataset`, `jsonl` modules).
//! - Serialization back to JSON and load/save of a metadata + train + test
//!   dataset pair on the local filesystem (`serialize`, `metadata`,
//!   `loader`, `storage` modules).
//!
//! All I/O is blocking.
#![deny(missing_docs)]
pub mod dataset;
pub mod entry;
pub mod frequency;
pub mod jsonl;
pub mod loader;
pub mod metadata;
pub mod process;
pub mod serialize;
pub mod storage;
pub mod timestamp;
