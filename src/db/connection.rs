// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Driver seam - the few primitives the gateway needs from a connection

use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, ToSql};
use std::path::Path;

use super::tables::{Column, ColumnType, Record, Value};
use crate::error::Result;

/// A value bound for a statement, with the column type it targets
pub(crate) type Param = (Value, ColumnType);

/// Statement execution over one open connection
pub(crate) trait SqlConnection {
    /// Run a statement, returning affected rows
    fn run(&mut self, sql: &str, params: &[Param]) -> Result<usize>;

    /// Run a query, decoding each row by `columns`
    fn fetch(&mut self, sql: &str, params: &[Param], columns: &[Column]) -> Result<Vec<Record>>;

    /// Run several parameterless statements
    fn run_batch(&mut self, sql: &str) -> Result<()>;
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(_) => Value::Text(value.as_str()?.to_string()),
            ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        })
    }
}

/// Open a SQLite file (or `:memory:`), creating parent directories
pub(crate) fn open_sqlite(path: &str) -> Result<rusqlite::Connection> {
    if path != ":memory:" {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch(
        r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    "#,
    )?;
    Ok(conn)
}

impl SqlConnection for rusqlite::Connection {
    fn run(&mut self, sql: &str, params: &[Param]) -> Result<usize> {
        let mut stmt = self.prepare(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter().map(|(v, _)| v)))?)
    }

    fn fetch(&mut self, sql: &str, params: &[Param], columns: &[Column]) -> Result<Vec<Record>> {
        let mut stmt = self.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter().map(|(v, _)| v)))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                let value: Value = row.get(i)?;
                record.insert(column.name.to_string(), value.widen(column.ty));
            }
            results.push(record);
        }
        Ok(results)
    }

    fn run_batch(&mut self, sql: &str) -> Result<()> {
        self.execute_batch(sql)?;
        Ok(())
    }
}
