// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Typed schema - tables, columns, rows and plain records

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Plain row representation: column name to value
pub type Record = BTreeMap<String, Value>;

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit integer
    Integer(i64),
    /// Double precision float
    Real(f64),
    /// UTF-8 text
    Text(String),
}

impl Value {
    /// Accept `self` for a column of type `ty`, widening integers to reals
    pub(crate) fn bind(self, table: Table, field: &str, ty: ColumnType) -> Result<Value> {
        match (ty, self) {
            (_, Value::Null) => Ok(Value::Null),
            (ColumnType::Text, v @ Value::Text(_)) => Ok(v),
            (ColumnType::Integer, v @ Value::Integer(_)) => Ok(v),
            (ColumnType::Real, v @ Value::Real(_)) => Ok(v),
            (ColumnType::Real, Value::Integer(i)) => Ok(Value::Real(i as f64)),
            (ty, _) => Err(Error::InvalidValue {
                table: table.name(),
                field: field.to_string(),
                expected: ty.name(),
            }),
        }
    }

    /// Normalise a value read back from the store
    pub(crate) fn widen(self, ty: ColumnType) -> Value {
        match (ty, self) {
            (ColumnType::Real, Value::Integer(i)) => Value::Real(i as f64),
            (_, v) => v,
        }
    }

    /// Primary-key form of the value
    pub fn to_key(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Text value, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integer value, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `TEXT`
    Text,
    /// `INTEGER` / `BIGINT`
    Integer,
    /// `REAL` / `DOUBLE PRECISION`
    Real,
}

impl ColumnType {
    /// Lower-case type name used in errors
    pub const fn name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
        }
    }
}

/// Column definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: &'static str,
    /// Storage type
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

const USER_COLUMNS: &[Column] = &[
    col("uuid", ColumnType::Text),
    col("email_list", ColumnType::Text),
    col("usr_fn", ColumnType::Text),
    col("usr_ln", ColumnType::Text),
    col("authorization", ColumnType::Integer),
    col("pubkey", ColumnType::Text),
    col("stripe_id", ColumnType::Text),
    col("timestamp", ColumnType::Real),
];

const MEASUREMENT_COLUMNS: &[Column] = &[
    col("measurement_hash", ColumnType::Text),
    col("measurement_type", ColumnType::Text),
    col("measurement_locat", ColumnType::Text),
    col("measurement_value", ColumnType::Real),
    col("measurement_dim", ColumnType::Text),
    col("timestamp", ColumnType::Real),
];

/// Tables of the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    /// `users`
    Users,
    /// `measurement`
    Measurement,
}

impl Table {
    /// Every table of the schema
    pub const ALL: [Table; 2] = [Table::Users, Table::Measurement];

    /// SQL table name
    pub const fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Measurement => "measurement",
        }
    }

    /// Columns in storage order
    pub fn columns(self) -> &'static [Column] {
        match self {
            Table::Users => USER_COLUMNS,
            Table::Measurement => MEASUREMENT_COLUMNS,
        }
    }

    /// Name of the primary-key column
    pub const fn primary_key(self) -> &'static str {
        match self {
            Table::Users => "uuid",
            Table::Measurement => "measurement_hash",
        }
    }

    /// Column by name, or [`Error::UnknownField`]
    pub fn column(self, field: &str) -> Result<Column> {
        self.columns()
            .iter()
            .copied()
            .find(|c| c.name == field)
            .ok_or_else(|| Error::UnknownField {
                table: self.name(),
                field: field.to_string(),
            })
    }

    /// Build a typed row from a plain record; a measurement without a key gets its content hash
    pub fn construct(self, record: &Record) -> Result<Row> {
        for field in record.keys() {
            self.column(field)?;
        }
        match self {
            Table::Users => User::from_record(record).map(Row::User),
            Table::Measurement => Measurement::from_record(record).map(Row::Measurement),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Table::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}

fn text(table: Table, record: &Record, field: &'static str) -> Result<Option<String>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Text(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::InvalidValue {
            table: table.name(),
            field: field.to_string(),
            expected: ColumnType::Text.name(),
        }),
    }
}

fn required_text(table: Table, record: &Record, field: &'static str) -> Result<String> {
    text(table, record, field)?.ok_or(Error::MissingField {
        table: table.name(),
        field,
    })
}

fn real(table: Table, record: &Record, field: &'static str) -> Result<Option<f64>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| Error::InvalidValue {
            table: table.name(),
            field: field.to_string(),
            expected: ColumnType::Real.name(),
        }),
    }
}

fn required_real(table: Table, record: &Record, field: &'static str) -> Result<f64> {
    real(table, record, field)?.ok_or(Error::MissingField {
        table: table.name(),
        field,
    })
}

fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A person whose data the store keeps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Primary key
    pub uuid: String,
    /// Contact addresses
    pub email_list: String,
    /// First name
    pub usr_fn: String,
    /// Last name
    pub usr_ln: String,
    /// Access level
    pub authorization: i64,
    /// Public key, if registered
    pub pubkey: Option<String>,
    /// Payment provider id
    pub stripe_id: String,
    /// Creation time, Unix seconds
    pub timestamp: f64,
}

impl User {
    /// Fresh user with a random v4 key, stamped now
    pub fn new(email_list: &str, usr_fn: &str, usr_ln: &str) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().simple().to_string(),
            email_list: email_list.to_string(),
            usr_fn: usr_fn.to_string(),
            usr_ln: usr_ln.to_string(),
            authorization: 0,
            pubkey: None,
            stripe_id: String::new(),
            timestamp: now_seconds(),
        }
    }

    /// `uuid` is required; missing `timestamp` becomes the current time
    pub fn from_record(record: &Record) -> Result<Self> {
        let table = Table::Users;
        let authorization = match record.get("authorization") {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().ok_or_else(|| Error::InvalidValue {
                table: table.name(),
                field: "authorization".to_string(),
                expected: ColumnType::Integer.name(),
            })?,
        };

        Ok(Self {
            uuid: required_text(table, record, "uuid")?,
            email_list: required_text(table, record, "email_list")?,
            usr_fn: required_text(table, record, "usr_fn")?,
            usr_ln: text(table, record, "usr_ln")?.unwrap_or_default(),
            authorization,
            pubkey: text(table, record, "pubkey")?,
            stripe_id: text(table, record, "stripe_id")?.unwrap_or_default(),
            timestamp: real(table, record, "timestamp")?.unwrap_or_else(now_seconds),
        })
    }

    /// Plain form of the row
    pub fn to_record(&self) -> Record {
        Record::from([
            ("uuid".to_string(), self.uuid.clone().into()),
            ("email_list".to_string(), self.email_list.clone().into()),
            ("usr_fn".to_string(), self.usr_fn.clone().into()),
            ("usr_ln".to_string(), self.usr_ln.clone().into()),
            ("authorization".to_string(), self.authorization.into()),
            ("pubkey".to_string(), self.pubkey.clone().into()),
            ("stripe_id".to_string(), self.stripe_id.clone().into()),
            ("timestamp".to_string(), self.timestamp.into()),
        ])
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<33}:{:>4} {:<15} {:<15} - email: {:<35} - added: {}",
            self.uuid, self.authorization, self.usr_fn, self.usr_ln, self.email_list, self.timestamp
        )
    }
}

/// One stored channel value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Primary key, see [`Measurement::content_hash`]
    pub measurement_hash: String,
    /// Channel name
    pub measurement_type: String,
    /// Where it was taken
    pub measurement_locat: String,
    /// Measured value
    pub measurement_value: f64,
    /// Unit
    pub measurement_dim: String,
    /// Snapshot time, Unix seconds
    pub timestamp: f64,
}

impl Measurement {
    /// Missing `measurement_hash` is derived from the other fields
    pub fn from_record(record: &Record) -> Result<Self> {
        let table = Table::Measurement;
        let mut row = Self {
            measurement_hash: String::new(),
            measurement_type: required_text(table, record, "measurement_type")?,
            measurement_locat: required_text(table, record, "measurement_locat")?,
            measurement_value: required_real(table, record, "measurement_value")?,
            measurement_dim: required_text(table, record, "measurement_dim")?,
            timestamp: required_real(table, record, "timestamp")?,
        };
        row.measurement_hash = match text(table, record, "measurement_hash")? {
            Some(hash) => hash,
            None => row.content_hash(),
        };
        Ok(row)
    }

    /// SHA-256 over type, location, value, dimension and time.
    ///
    /// Rows with equal content share a key, so the store keeps one of them.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.measurement_type.as_bytes());
        hasher.update(b"|");
        hasher.update(self.measurement_locat.as_bytes());
        hasher.update(b"|");
        hasher.update(self.measurement_value.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.measurement_dim.as_bytes());
        hasher.update(b"|");
        hasher.update(self.timestamp.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Plain form of the row
    pub fn to_record(&self) -> Record {
        Record::from([
            ("measurement_hash".to_string(), self.measurement_hash.clone().into()),
            ("measurement_type".to_string(), self.measurement_type.clone().into()),
            ("measurement_locat".to_string(), self.measurement_locat.clone().into()),
            ("measurement_value".to_string(), self.measurement_value.into()),
            ("measurement_dim".to_string(), self.measurement_dim.clone().into()),
            ("timestamp".to_string(), self.timestamp.into()),
        ])
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<33}:{:>12} {}{} @ {} - added: {}",
            self.measurement_hash,
            self.measurement_type,
            self.measurement_value,
            self.measurement_dim,
            self.measurement_locat,
            self.timestamp
        )
    }
}

/// A typed row of any table
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// A `users` row
    User(User),
    /// A `measurement` row
    Measurement(Measurement),
}

impl Row {
    /// Table the row belongs to
    pub fn table(&self) -> Table {
        match self {
            Row::User(_) => Table::Users,
            Row::Measurement(_) => Table::Measurement,
        }
    }

    /// Plain form of the row
    pub fn to_record(&self) -> Record {
        match self {
            Row::User(u) => u.to_record(),
            Row::Measurement(m) => m.to_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement_record() -> Record {
        Record::from([
            ("measurement_type".to_string(), Value::from("humidity")),
            ("measurement_locat".to_string(), Value::from("cellar")),
            ("measurement_value".to_string(), Value::Integer(40)),
            ("measurement_dim".to_string(), Value::from("%")),
            ("timestamp".to_string(), Value::Real(1_792_397_700.0)),
        ])
    }

    #[test]
    fn test_table_lookup() {
        assert_eq!("users".parse::<Table>().unwrap(), Table::Users);
        assert_eq!("measurement".parse::<Table>().unwrap(), Table::Measurement);
        assert!(matches!("documents".parse::<Table>(), Err(Error::UnknownTable(_))));
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            Table::Users.column("password"),
            Err(Error::UnknownField { table: "users", .. })
        ));
        let mut record = measurement_record();
        record.insert("colour".to_string(), Value::from("red"));
        assert!(Table::Measurement.construct(&record).is_err());
    }

    #[test]
    fn test_measurement_hash_is_stable() {
        let a = Measurement::from_record(&measurement_record()).unwrap();
        let b = Measurement::from_record(&measurement_record()).unwrap();
        assert_eq!(a.measurement_hash, b.measurement_hash);
        assert_eq!(a.measurement_hash.len(), 64);
        assert_eq!(a.measurement_value, 40.0);

        let mut other = measurement_record();
        other.insert("measurement_value".to_string(), Value::Real(40.1));
        let c = Measurement::from_record(&other).unwrap();
        assert_ne!(a.measurement_hash, c.measurement_hash);
    }

    #[test]
    fn test_measurement_missing_field() {
        let mut record = measurement_record();
        record.remove("measurement_dim");
        assert!(matches!(
            Measurement::from_record(&record),
            Err(Error::MissingField { field: "measurement_dim", .. })
        ));
    }

    #[test]
    fn test_user_requires_uuid() {
        let record = Record::from([
            ("email_list".to_string(), Value::from("ada@example.org")),
            ("usr_fn".to_string(), Value::from("Ada")),
        ]);
        assert!(matches!(
            Table::Users.construct(&record),
            Err(Error::MissingField { table: "users", field: "uuid" })
        ));
    }

    #[test]
    fn test_new_user_round_trips() {
        let user = User::new("ada@example.org", "Ada", "Lovelace");
        assert_eq!(user.uuid.len(), 32);
        assert_ne!(user.uuid, User::new("ada@example.org", "Ada", "Lovelace").uuid);

        let row = Table::Users.construct(&user.to_record()).unwrap();
        assert_eq!(row, Row::User(user));
    }

    #[test]
    fn test_user_defaults() {
        let record = Record::from([
            ("uuid".to_string(), Value::from("u-1")),
            ("email_list".to_string(), Value::from("ada@example.org")),
            ("usr_fn".to_string(), Value::from("Ada")),
        ]);
        let row = Table::Users.construct(&record).unwrap();
        let Row::User(user) = row else {
            panic!("expected a user row");
        };

        assert_eq!(user.uuid, "u-1");
        assert_eq!(user.usr_ln, "");
        assert_eq!(user.authorization, 0);
        assert_eq!(user.pubkey, None);
        assert!(user.timestamp > 0.0);
        assert_eq!(user.to_record()["pubkey"], Value::Null);
    }

    #[test]
    fn test_bind_types() {
        let ty = ColumnType::Real;
        assert_eq!(Value::Integer(3).bind(Table::Measurement, "timestamp", ty).unwrap(), Value::Real(3.0));
        assert!(Value::from("x").bind(Table::Measurement, "timestamp", ty).is_err());
        assert_eq!(Value::Null.bind(Table::Users, "authorization", ColumnType::Integer).unwrap(), Value::Null);
    }

    #[test]
    fn test_value_json() {
        let record: Record = serde_json::from_str(r#"{"a": null, "b": 1, "c": 1.5, "d": "x"}"#).unwrap();
        assert_eq!(record["a"], Value::Null);
        assert_eq!(record["b"], Value::Integer(1));
        assert_eq!(record["c"], Value::Real(1.5));
        assert_eq!(record["d"], Value::from("x"));
    }
}
