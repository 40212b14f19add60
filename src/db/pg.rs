// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! PostgreSQL driver for the gateway

use postgres::types::ToSql;
use postgres::{Client, NoTls};

use super::connection::{Param, SqlConnection};
use super::tables::{Column, ColumnType, Record, Value};
use crate::error::Result;

pub(crate) fn open_postgres(url: &str) -> Result<Client> {
    Ok(Client::connect(url, NoTls)?)
}

/// Typed boxes so NULLs carry the column's type
fn to_pg(params: &[Param]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|(value, ty)| -> Box<dyn ToSql + Sync> {
            match (ty, value) {
                (ColumnType::Text, Value::Text(s)) => Box::new(Some(s.clone())),
                (ColumnType::Integer, Value::Integer(i)) => Box::new(Some(*i)),
                (ColumnType::Real, Value::Real(f)) => Box::new(Some(*f)),
                (ColumnType::Real, Value::Integer(i)) => Box::new(Some(*i as f64)),
                (ColumnType::Text, _) => Box::new(None::<String>),
                (ColumnType::Integer, _) => Box::new(None::<i64>),
                (ColumnType::Real, _) => Box::new(None::<f64>),
            }
        })
        .collect()
}

impl SqlConnection for Client {
    fn run(&mut self, sql: &str, params: &[Param]) -> Result<usize> {
        let boxed = to_pg(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref()).collect();
        Ok(self.execute(sql, &refs)? as usize)
    }

    fn fetch(&mut self, sql: &str, params: &[Param], columns: &[Column]) -> Result<Vec<Record>> {
        let boxed = to_pg(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed.iter().map(|b| b.as_ref()).collect();

        let mut results = Vec::new();
        for row in self.query(sql, &refs)? {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                let value: Value = match column.ty {
                    ColumnType::Text => row.try_get::<_, Option<String>>(i)?.into(),
                    ColumnType::Integer => row.try_get::<_, Option<i64>>(i)?.into(),
                    ColumnType::Real => row.try_get::<_, Option<f64>>(i)?.into(),
                };
                record.insert(column.name.to_string(), value);
            }
            results.push(record);
        }
        Ok(results)
    }

    fn run_batch(&mut self, sql: &str) -> Result<()> {
        self.batch_execute(sql)?;
        Ok(())
    }
}
