use crate::Value;
use std::sync::Arc;

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted identifier when available.
    pub last_affected_id: Option<i64>,
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .map(|i| &self.values()[i])
    }
}

/// Fully materialized rows produced by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub labels: RowNames,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(labels: RowNames, rows: Vec<Row>) -> Self {
        Self { labels, rows }
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn rows(&self) -> impl Iterator<Item = RowLabeled> + '_ {
        self.rows
            .iter()
            .map(|v| RowLabeled::new(self.labels.clone(), v.clone()))
    }
    /// Truncates to at most `max_rows` rows, `0` meaning no limit.
    pub fn limit(mut self, max_rows: u64) -> Self {
        if max_rows > 0 {
            self.rows.truncate(max_rows as usize);
        }
        self
    }
}

/// Which auto-generated keys an ad-hoc SQL execution should make available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeneratedKeys {
    #[default]
    None,
    Return,
    ColumnIndexes(Vec<u32>),
    ColumnNames(Vec<String>),
}

impl GeneratedKeys {
    pub fn requested(&self) -> bool {
        !matches!(self, GeneratedKeys::None)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Concurrency {
    #[default]
    ReadOnly,
    Updatable,
}

/// Scroll type and concurrency requested for the result sets of a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultSetMode {
    pub scroll: ResultSetType,
    pub concurrency: Concurrency,
}

impl ResultSetMode {
    pub fn new(scroll: ResultSetType, concurrency: Concurrency) -> Self {
        Self {
            scroll,
            concurrency,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Holdability {
    HoldCursorsOverCommit,
    #[default]
    CloseCursorsAtCommit,
}
