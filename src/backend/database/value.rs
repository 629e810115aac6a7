//! Backend-neutral values, column descriptions and decoded rows.

use crate::error::{AppError, AppResult};

/// A bindable SQL argument. NULL is never bound: an absent optional field
/// selects another statement variant instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Boolean(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

/// Storage class of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Convert caller-supplied text into a value of this kind
    pub fn parse_value(&self, raw: &str) -> Option<SqlValue> {
        let raw = raw.trim();
        match self {
            ColumnKind::Integer => raw.parse::<i64>().ok().map(SqlValue::Integer),
            ColumnKind::Real => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(SqlValue::Real),
            ColumnKind::Boolean => raw.parse::<bool>().ok().map(SqlValue::Boolean),
            ColumnKind::Text => Some(SqlValue::Text(raw.to_string())),
        }
    }
}

/// A column produced by an entity's base query
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// SQL dialect of the connected backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Positional placeholder for the `index`-th argument (1-based)
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }
}

/// One decoded result row, in base-query column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<(&'static str, Option<SqlValue>)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: &'static str, value: Option<SqlValue>) {
        self.values.push((column, value));
    }

    pub fn with(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.push(column, Some(value.into()));
        self
    }

    pub fn with_null(mut self, column: &'static str) -> Self {
        self.push(column, None);
        self
    }

    fn value(&self, column: &str) -> AppResult<Option<&SqlValue>> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value.as_ref())
            .ok_or_else(|| {
                AppError::InternalConfiguration(format!(
                    "Column '{}' missing from result row",
                    column
                ))
            })
    }

    fn required(&self, column: &str) -> AppResult<&SqlValue> {
        self.value(column)?.ok_or_else(|| {
            AppError::InternalServer(format!("Column '{}' was unexpectedly NULL", column))
        })
    }

    pub fn get_i64(&self, column: &str) -> AppResult<i64> {
        match self.required(column)? {
            SqlValue::Integer(v) => Ok(*v),
            other => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn get_opt_i64(&self, column: &str) -> AppResult<Option<i64>> {
        match self.value(column)? {
            None => Ok(None),
            Some(SqlValue::Integer(v)) => Ok(Some(*v)),
            Some(other) => Err(type_mismatch(column, "integer", other)),
        }
    }

    pub fn get_f64(&self, column: &str) -> AppResult<f64> {
        match self.required(column)? {
            SqlValue::Real(v) => Ok(*v),
            SqlValue::Integer(v) => Ok(*v as f64),
            other => Err(type_mismatch(column, "real", other)),
        }
    }

    pub fn get_bool(&self, column: &str) -> AppResult<bool> {
        match self.required(column)? {
            SqlValue::Boolean(v) => Ok(*v),
            SqlValue::Integer(v) => Ok(*v != 0),
            other => Err(type_mismatch(column, "boolean", other)),
        }
    }

    pub fn get_string(&self, column: &str) -> AppResult<String> {
        match self.required(column)? {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(type_mismatch(column, "text", other)),
        }
    }

    pub fn get_opt_string(&self, column: &str) -> AppResult<Option<String>> {
        match self.value(column)? {
            None => Ok(None),
            Some(SqlValue::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Err(type_mismatch(column, "text", other)),
        }
    }
}

fn type_mismatch(column: &str, expected: &str, found: &SqlValue) -> AppError {
    AppError::InternalServer(format!(
        "Column '{}' expected {} but found {:?}",
        column, expected, found
    ))
}
