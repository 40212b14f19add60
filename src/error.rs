// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Error types

use thiserror::Error;

use crate::db::Dialect;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Library error type
#[derive(Debug, Error)]
pub enum Error {
    /// Neither the live board nor the emulator could be opened
    #[error("missing display/sensor: no usable backend (tried {attempted})")]
    MissingDisplay {
        /// Backends that were attempted, in order
        attempted: String,
    },

    /// A sensor chip misbehaved or returned unusable data
    #[error("sensor error: {0}")]
    Sensor(String),

    /// The CPU temperature probe failed or printed something unparsable
    #[error("cpu temperature probe: {0}")]
    CpuProbe(String),

    /// Filesystem or device I/O
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// History index outside the recorded range
    #[error("no snapshot at index {0}")]
    NoSnapshot(isize),

    /// Table name that is not part of the schema
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Column name that the table does not have
    #[error("table {table} has no field {field}")]
    UnknownField {
        /// Table name
        table: &'static str,
        /// Offending field
        field: String,
    },

    /// Record lacks a field required to construct a row
    #[error("record for {table} is missing field {field}")]
    MissingField {
        /// Table name
        table: &'static str,
        /// Missing field
        field: &'static str,
    },

    /// Record value does not fit the column type
    #[error("field {field} of {table} expects {expected}")]
    InvalidValue {
        /// Table name
        table: &'static str,
        /// Field name
        field: String,
        /// Expected column type
        expected: &'static str,
    },

    /// Dialect tag that is not recognised
    #[error("no valid dialect defined: {0}")]
    UnknownDialect(String),

    /// Dialect recognised but not compiled in
    #[error("{0} support is not compiled in")]
    DialectUnavailable(Dialect),

    /// SQLite failure
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL failure
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] postgres::Error),
}
