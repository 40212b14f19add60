// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Database module for persistent storage
//!
//! A small row store over the `users` and `measurement` tables. Every
//! [`Gateway`] operation takes an optional caller [`Session`]: without one
//! the gateway opens a session, runs the operation in its own transaction
//! and commits (or rolls back on error); with one, the caller decides when
//! to commit.

mod connection;
#[cfg(feature = "postgres")]
mod pg;
mod tables;

pub use tables::{Column, ColumnType, Measurement, Record, Row, Table, User, Value};

use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use connection::{open_sqlite, Param, SqlConnection};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// SQL dialects the gateway speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// SQLite file or `:memory:`
    Sqlite,
    /// PostgreSQL server
    Postgres,
}

impl Dialect {
    fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", n),
            Dialect::Postgres => format!("${}", n),
        }
    }

    fn column_type(self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (_, ColumnType::Text) => "TEXT",
            (Dialect::Sqlite, ColumnType::Integer) => "INTEGER",
            (Dialect::Sqlite, ColumnType::Real) => "REAL",
            (Dialect::Postgres, ColumnType::Integer) => "BIGINT",
            (Dialect::Postgres, ColumnType::Real) => "DOUBLE PRECISION",
        }
    }

    fn create_table(self, table: Table) -> String {
        let columns = table
            .columns()
            .iter()
            .map(|c| {
                let key = if c.name == table.primary_key() { " PRIMARY KEY" } else { "" };
                format!("{} {}{}", quote(c.name), self.column_type(c.ty), key)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({});", quote(table.name()), columns)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Sqlite => f.write_str("SQLite"),
            Dialect::Postgres => f.write_str("PostGreSQL"),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::Sqlite),
            "postgresql" | "postgres" => Ok(Dialect::Postgres),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}

/// Identifiers only ever come from the static schema
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident)
}

const COUNT: Column = Column {
    name: "count",
    ty: ColumnType::Integer,
};

/// An open connection with the schema in place
pub struct Session {
    conn: Box<dyn SqlConnection>,
    dialect: Dialect,
    in_transaction: bool,
}

impl Session {
    /// Connect and create missing tables
    pub fn open(dialect: Dialect, url: &str) -> Result<Self> {
        let conn: Box<dyn SqlConnection> = match dialect {
            Dialect::Sqlite => Box::new(open_sqlite(url)?),
            Dialect::Postgres => open_postgres(url)?,
        };
        let mut session = Self {
            conn,
            dialect,
            in_transaction: false,
        };
        session.create_tables()?;
        debug!("{} session opened", dialect);
        Ok(session)
    }

    /// Dialect of the connection
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Start a transaction; statements outside one commit on their own
    pub fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.run_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Commit the open transaction, if any
    pub fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.run_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Discard the open transaction, if any
    pub fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.run_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// `CREATE TABLE IF NOT EXISTS` for every table
    pub fn create_tables(&mut self) -> Result<()> {
        let sql: String = Table::ALL.iter().map(|t| self.dialect.create_table(*t)).collect();
        self.conn.run_batch(&sql)
    }

    /// `DROP TABLE IF EXISTS` for each of `tables`
    pub fn drop_tables(&mut self, tables: &[Table]) -> Result<()> {
        for table in tables {
            self.conn
                .run_batch(&format!("DROP TABLE IF EXISTS {}", quote(table.name())))?;
            info!("Dropped table {}", table);
        }
        Ok(())
    }

    /// `column IN (...)` with its parameters appended to `params`
    fn in_clause(
        &self,
        table: Table,
        column: Column,
        values: &[Value],
        params: &mut Vec<Param>,
    ) -> Result<String> {
        let mut slots = Vec::with_capacity(values.len());
        for value in values {
            params.push((value.clone().bind(table, column.name, column.ty)?, column.ty));
            slots.push(self.dialect.placeholder(params.len()));
        }
        Ok(format!("{} IN ({})", quote(column.name), slots.join(", ")))
    }

    fn select_list(table: Table) -> String {
        table
            .columns()
            .iter()
            .map(|c| quote(c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Insert records whose `primary_key` value is not stored yet.
    ///
    /// Returns the keys actually inserted, in input order. Records repeating
    /// an already stored (or earlier in the batch) key are skipped.
    pub fn insert_if_absent(
        &mut self,
        table: Table,
        primary_key: &str,
        records: &[Record],
    ) -> Result<Vec<String>> {
        let key_column = table.column(primary_key)?;
        let columns = table.columns();
        let slots: Vec<String> = (1..=columns.len()).map(|n| self.dialect.placeholder(n)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table.name()),
            Self::select_list(table),
            slots.join(", ")
        );
        let exists_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = {}",
            quote(table.name()),
            quote(primary_key),
            self.dialect.placeholder(1)
        );

        let mut inserted = Vec::new();
        for record in records {
            let row = table.construct(record)?.to_record();
            let key = row.get(primary_key).cloned().unwrap_or(Value::Null);

            let lookup = [(key.clone().bind(table, primary_key, key_column.ty)?, key_column.ty)];
            let found = self.conn.fetch(&exists_sql, &lookup, &[COUNT])?;
            let count = found
                .first()
                .and_then(|r| r.get(COUNT.name))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            if count > 0 {
                debug!("{} {} already present, skipped", table, key.to_key());
                continue;
            }

            let params = columns
                .iter()
                .map(|c| {
                    let value = row.get(c.name).cloned().unwrap_or(Value::Null);
                    Ok((value.bind(table, c.name, c.ty)?, c.ty))
                })
                .collect::<Result<Vec<Param>>>()?;
            self.conn.run(&insert_sql, &params)?;
            inserted.push(key.to_key());
        }

        debug!("Inserted {} of {} rows into {}", inserted.len(), records.len(), table);
        Ok(inserted)
    }

    /// Overwrite `patch` fields on every row whose `filter_field` is in `filter_values`
    pub fn update_where(
        &mut self,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
        patch: &Record,
    ) -> Result<usize> {
        let filter = table.column(filter_field)?;

        let mut params = Vec::new();
        let mut assignments = Vec::new();
        for (field, value) in patch {
            let column = table.column(field)?;
            params.push((value.clone().bind(table, field, column.ty)?, column.ty));
            assignments.push(format!(
                "{} = {}",
                quote(column.name),
                self.dialect.placeholder(params.len())
            ));
        }
        if filter_values.is_empty() || assignments.is_empty() {
            return Ok(0);
        }

        let clause = self.in_clause(table, filter, filter_values, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote(table.name()),
            assignments.join(", "),
            clause
        );
        let updated = self.conn.run(&sql, &params)?;
        debug!("Updated {} rows of {}", updated, table);
        Ok(updated)
    }

    /// Apply a separate patch per filter value
    pub fn update_each(
        &mut self,
        table: Table,
        filter_field: &str,
        patches: &[(Value, Record)],
    ) -> Result<usize> {
        let mut updated = 0;
        for (value, patch) in patches {
            updated += self.update_where(table, filter_field, std::slice::from_ref(value), patch)?;
        }
        Ok(updated)
    }

    /// Delete rows whose `filter_field` is in `filter_values`
    pub fn delete_where(
        &mut self,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
    ) -> Result<usize> {
        let filter = table.column(filter_field)?;
        if filter_values.is_empty() {
            return Ok(0);
        }

        let mut params = Vec::new();
        let clause = self.in_clause(table, filter, filter_values, &mut params)?;
        let sql = format!("DELETE FROM {} WHERE {}", quote(table.name()), clause);
        let deleted = self.conn.run(&sql, &params)?;
        debug!("Deleted {} rows of {}", deleted, table);
        Ok(deleted)
    }

    /// Every row, ascending by `order_by`
    pub fn query_all(&mut self, table: Table, order_by: &str) -> Result<Vec<Record>> {
        let order = table.column(order_by)?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            Self::select_list(table),
            quote(table.name()),
            quote(order.name)
        );
        self.conn.fetch(&sql, &[], table.columns())
    }

    /// Rows whose `filter_field` is in `filter_values`, ascending by `order_by`
    pub fn query_where(
        &mut self,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
        order_by: &str,
    ) -> Result<Vec<Record>> {
        let filter = table.column(filter_field)?;
        let order = table.column(order_by)?;
        if filter_values.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = Vec::new();
        let clause = self.in_clause(table, filter, filter_values, &mut params)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} ASC",
            Self::select_list(table),
            quote(table.name()),
            clause,
            quote(order.name)
        );
        self.conn.fetch(&sql, &params, table.columns())
    }

    /// Number of rows in `table`
    pub fn count(&mut self, table: Table) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote(table.name()));
        let rows = self.conn.fetch(&sql, &[], &[COUNT])?;
        Ok(rows
            .first()
            .and_then(|r| r.get(COUNT.name))
            .and_then(Value::as_i64)
            .unwrap_or(0) as usize)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Err(e) = self.rollback() {
                warn!("Rollback on close failed: {}", e);
            }
        }
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(url: &str) -> Result<Box<dyn SqlConnection>> {
    Ok(Box::new(pg::open_postgres(url)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_url: &str) -> Result<Box<dyn SqlConnection>> {
    Err(Error::DialectUnavailable(Dialect::Postgres))
}

/// CRUD facade that opens a short-lived session when the caller has none
#[derive(Debug, Clone)]
pub struct Gateway {
    dialect: Dialect,
    url: String,
}

impl Gateway {
    /// Gateway for `url` in `dialect`
    pub fn new(dialect: Dialect, url: impl Into<String>) -> Self {
        Self {
            dialect,
            url: url.into(),
        }
    }

    /// Gateway for the configured store; an unknown dialect tag is an error
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(config.dialect.parse()?, config.url.clone()))
    }

    /// Dialect sessions are opened with
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// New session the caller owns
    pub fn session(&self) -> Result<Session> {
        Session::open(self.dialect, &self.url)
    }

    fn scoped<T>(
        &self,
        session: Option<&mut Session>,
        op: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        if let Some(session) = session {
            return op(session);
        }

        let mut session = self.session()?;
        session.begin()?;
        match op(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = session.rollback() {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    /// See [`Session::insert_if_absent`]
    pub fn insert_if_absent(
        &self,
        session: Option<&mut Session>,
        table: Table,
        primary_key: &str,
        records: &[Record],
    ) -> Result<Vec<String>> {
        self.scoped(session, |s| s.insert_if_absent(table, primary_key, records))
    }

    /// See [`Session::update_where`]
    pub fn update_where(
        &self,
        session: Option<&mut Session>,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
        patch: &Record,
    ) -> Result<usize> {
        self.scoped(session, |s| s.update_where(table, filter_field, filter_values, patch))
    }

    /// See [`Session::update_each`]
    pub fn update_each(
        &self,
        session: Option<&mut Session>,
        table: Table,
        filter_field: &str,
        patches: &[(Value, Record)],
    ) -> Result<usize> {
        self.scoped(session, |s| s.update_each(table, filter_field, patches))
    }

    /// See [`Session::delete_where`]
    pub fn delete_where(
        &self,
        session: Option<&mut Session>,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
    ) -> Result<usize> {
        self.scoped(session, |s| s.delete_where(table, filter_field, filter_values))
    }

    /// See [`Session::query_all`]
    pub fn query_all(
        &self,
        session: Option<&mut Session>,
        table: Table,
        order_by: &str,
    ) -> Result<Vec<Record>> {
        self.scoped(session, |s| s.query_all(table, order_by))
    }

    /// See [`Session::query_where`]
    pub fn query_where(
        &self,
        session: Option<&mut Session>,
        table: Table,
        filter_field: &str,
        filter_values: &[Value],
        order_by: &str,
    ) -> Result<Vec<Record>> {
        self.scoped(session, |s| s.query_where(table, filter_field, filter_values, order_by))
    }

    /// See [`Session::drop_tables`]
    pub fn drop_tables(&self, session: Option<&mut Session>, tables: &[Table]) -> Result<()> {
        self.scoped(session, |s| s.drop_tables(tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    use crate::config::EmulatorConfig;
    use crate::core::{ChannelMask, EnvironmentalReadings, RecorderSettings};
    use crate::sensors::Emulator;

    /// SQLite file removed on drop
    struct TempDb(PathBuf);

    impl TempDb {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("sensehat-{}.db", uuid::Uuid::new_v4())))
        }

        fn gateway(&self) -> Gateway {
            Gateway::new(Dialect::Sqlite, self.0.to_string_lossy())
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn user(uuid: &str, first: &str) -> Record {
        Record::from([
            ("uuid".to_string(), Value::from(uuid)),
            ("email_list".to_string(), Value::from(format!("{}@example.org", first.to_lowercase()))),
            ("usr_fn".to_string(), Value::from(first)),
            ("authorization".to_string(), Value::Integer(1)),
        ])
    }

    fn keys(rows: &[Record], field: &str) -> Vec<String> {
        rows.iter().map(|r| r[field].to_key()).collect()
    }

    #[test]
    fn test_dialect_tags() {
        assert_eq!("SQLite".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert_eq!("PostGreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert!(matches!("MySQL".parse::<Dialect>(), Err(Error::UnknownDialect(_))));

        let config = DatabaseConfig {
            dialect: "Oracle".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(Gateway::from_config(&config).is_err());
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_postgres_needs_feature() {
        let gateway = Gateway::new(Dialect::Postgres, "host=localhost user=pi");
        assert!(matches!(
            gateway.session(),
            Err(Error::DialectUnavailable(Dialect::Postgres))
        ));
    }

    #[test]
    fn test_create_table_sql() {
        let sql = Dialect::Postgres.create_table(Table::Measurement);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"measurement\""));
        assert!(sql.contains("\"measurement_hash\" TEXT PRIMARY KEY"));
        assert!(sql.contains("\"measurement_value\" DOUBLE PRECISION"));
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::Sqlite.placeholder(3), "?3");
    }

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let records = vec![user("u-1", "Ada"), user("u-2", "Grace")];

        let first = gateway.insert_if_absent(None, Table::Users, "uuid", &records).unwrap();
        assert_eq!(first, vec!["u-1", "u-2"]);

        let second = gateway.insert_if_absent(None, Table::Users, "uuid", &records).unwrap();
        assert!(second.is_empty());

        let rows = gateway.query_all(None, Table::Users, "uuid").unwrap();
        assert_eq!(keys(&rows, "uuid"), vec!["u-1", "u-2"]);
    }

    #[test]
    fn test_duplicate_keys_in_batch() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let records = vec![user("u-1", "Ada"), user("u-1", "Other"), user("u-2", "Grace")];

        let inserted = gateway.insert_if_absent(None, Table::Users, "uuid", &records).unwrap();
        assert_eq!(inserted, vec!["u-1", "u-2"]);

        let rows = gateway.query_where(None, Table::Users, "uuid", &["u-1".into()], "uuid").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["usr_fn"], Value::from("Ada"));
    }

    #[test]
    fn test_users_without_uuid_are_rejected() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let mut keyless = user("ignored", "Ada");
        keyless.remove("uuid");

        for _ in 0..2 {
            let result = gateway.insert_if_absent(None, Table::Users, "uuid", &[keyless.clone()]);
            assert!(matches!(result, Err(Error::MissingField { field: "uuid", .. })));
        }
        assert_eq!(gateway.session().unwrap().count(Table::Users).unwrap(), 0);
    }

    #[test]
    fn test_new_users_insert_once() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let records: Vec<Record> = [
            User::new("ada@example.org", "Ada", "Lovelace"),
            User::new("grace@example.org", "Grace", "Hopper"),
        ]
        .iter()
        .map(User::to_record)
        .collect();

        let first = gateway.insert_if_absent(None, Table::Users, "uuid", &records).unwrap();
        assert_eq!(first.len(), 2);
        let second = gateway.insert_if_absent(None, Table::Users, "uuid", &records).unwrap();
        assert!(second.is_empty());
        assert_eq!(gateway.query_all(None, Table::Users, "uuid").unwrap().len(), 2);
    }

    #[test]
    fn test_update_where() {
        let db = TempDb::new();
        let gateway = db.gateway();
        gateway
            .insert_if_absent(None, Table::Users, "uuid", &[user("u-1", "Ada"), user("u-2", "Grace")])
            .unwrap();

        let patch = Record::from([
            ("authorization".to_string(), Value::Integer(5)),
            ("usr_ln".to_string(), Value::from("Lovelace")),
        ]);
        let updated = gateway
            .update_where(None, Table::Users, "uuid", &["u-1".into()], &patch)
            .unwrap();
        assert_eq!(updated, 1);

        let none = gateway
            .update_where(None, Table::Users, "uuid", &["u-9".into()], &patch)
            .unwrap();
        assert_eq!(none, 0);

        let rows = gateway.query_all(None, Table::Users, "uuid").unwrap();
        assert_eq!(rows[0]["authorization"], Value::Integer(5));
        assert_eq!(rows[0]["usr_ln"], Value::from("Lovelace"));
        assert_eq!(rows[1]["authorization"], Value::Integer(1));
    }

    #[test]
    fn test_update_each() {
        let db = TempDb::new();
        let gateway = db.gateway();
        gateway
            .insert_if_absent(None, Table::Users, "uuid", &[user("u-1", "Ada"), user("u-2", "Grace")])
            .unwrap();

        let patches = vec![
            ("u-1".into(), Record::from([("stripe_id".to_string(), Value::from("cus_a"))])),
            ("u-2".into(), Record::from([("stripe_id".to_string(), Value::from("cus_b"))])),
        ];
        assert_eq!(gateway.update_each(None, Table::Users, "uuid", &patches).unwrap(), 2);

        let rows = gateway.query_all(None, Table::Users, "uuid").unwrap();
        assert_eq!(keys(&rows, "stripe_id"), vec!["cus_a", "cus_b"]);
    }

    #[test]
    fn test_update_rejects_unknown_field() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let patch = Record::from([("password".to_string(), Value::from("x"))]);
        assert!(matches!(
            gateway.update_where(None, Table::Users, "uuid", &["u-1".into()], &patch),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let db = TempDb::new();
        let gateway = db.gateway();
        gateway
            .insert_if_absent(None, Table::Users, "uuid", &[user("u-1", "Ada"), user("u-2", "Grace")])
            .unwrap();

        let deleted = gateway
            .delete_where(None, Table::Users, "uuid", &["u-404".into()])
            .unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(gateway.session().unwrap().count(Table::Users).unwrap(), 2);

        let deleted = gateway
            .delete_where(None, Table::Users, "uuid", &["u-1".into(), "u-404".into()])
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(gateway.delete_where(None, Table::Users, "uuid", &[]).is_ok());
        assert_eq!(gateway.session().unwrap().count(Table::Users).unwrap(), 1);
    }

    #[test]
    fn test_query_where_ordered() {
        let db = TempDb::new();
        let gateway = db.gateway();
        gateway
            .insert_if_absent(
                None,
                Table::Users,
                "uuid",
                &[user("u-1", "Grace"), user("u-2", "Ada"), user("u-3", "Linus")],
            )
            .unwrap();

        let rows = gateway
            .query_where(None, Table::Users, "uuid", &["u-1".into(), "u-2".into()], "usr_fn")
            .unwrap();
        assert_eq!(keys(&rows, "usr_fn"), vec!["Ada", "Grace"]);

        let empty = gateway.query_where(None, Table::Users, "uuid", &[], "usr_fn").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_caller_session_owns_commit() {
        let db = TempDb::new();
        let gateway = db.gateway();

        let mut session = gateway.session().unwrap();
        session.begin().unwrap();
        gateway
            .insert_if_absent(Some(&mut session), Table::Users, "uuid", &[user("u-1", "Ada")])
            .unwrap();
        assert!(session.in_transaction());
        session.rollback().unwrap();
        assert_eq!(session.count(Table::Users).unwrap(), 0);

        session.begin().unwrap();
        gateway
            .insert_if_absent(Some(&mut session), Table::Users, "uuid", &[user("u-2", "Grace")])
            .unwrap();
        session.commit().unwrap();
        drop(session);

        let rows = gateway.query_all(None, Table::Users, "uuid").unwrap();
        assert_eq!(keys(&rows, "uuid"), vec!["u-2"]);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let db = TempDb::new();
        let gateway = db.gateway();

        let mut broken = user("u-2", "Grace");
        broken.remove("email_list");
        let result = gateway.insert_if_absent(None, Table::Users, "uuid", &[user("u-1", "Ada"), broken]);
        assert!(matches!(result, Err(Error::MissingField { field: "email_list", .. })));

        assert!(gateway.query_all(None, Table::Users, "uuid").unwrap().is_empty());
    }

    #[test]
    fn test_drop_tables() {
        let mut session = Session::open(Dialect::Sqlite, ":memory:").unwrap();
        session
            .insert_if_absent(Table::Users, "uuid", &[user("u-1", "Ada")])
            .unwrap();
        session.drop_tables(&[Table::Users]).unwrap();
        assert!(session.query_all(Table::Users, "uuid").is_err());

        session.create_tables().unwrap();
        assert_eq!(session.count(Table::Users).unwrap(), 0);
    }

    #[test]
    fn test_persist_readings_once() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let config = EmulatorConfig {
            cpu_temperature: 29.0,
            ..EmulatorConfig::default()
        };
        let mut readings = EnvironmentalReadings::new(
            Box::new(Emulator::new(&config)),
            ChannelMask::ALL,
            0.0,
            false,
            RecorderSettings::default(),
        );
        readings.measure().unwrap();

        let first = readings.persist(&gateway, "lab", None).unwrap();
        assert_eq!(first.len(), 3);
        let second = readings.persist(&gateway, "lab", None).unwrap();
        assert!(second.is_empty());

        let rows = gateway
            .query_where(None, Table::Measurement, "measurement_type", &["temperature".into()], "timestamp")
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["measurement_value"], Value::Real(-4.0));
        assert_eq!(rows[0]["measurement_locat"], Value::from("lab"));
    }

    #[test]
    fn test_same_minute_duplicates_share_rows() {
        let db = TempDb::new();
        let gateway = db.gateway();
        let mut readings = EnvironmentalReadings::new(
            Box::new(Emulator::new(&EmulatorConfig::default())),
            ChannelMask::new(6),
            0.0,
            false,
            RecorderSettings::default(),
        );
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 0).unwrap();
        readings.recorder_mut().measure_at(ChannelMask::new(6), now).unwrap();
        readings
            .recorder_mut()
            .measure_at(ChannelMask::new(6), now + chrono::Duration::seconds(40))
            .unwrap();
        assert_eq!(readings.history().len(), 2);

        let inserted = readings.persist(&gateway, "lab", None).unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(gateway.session().unwrap().count(Table::Measurement).unwrap(), 2);
    }
}
