use crate::{Bindings, CancelToken, FetchDirection, Holdability, ResultSet, Result};
use std::time::Duration;

/// Client side state shared by every statement implementation.
///
/// Drivers embed it in their statements and expose it through
/// [`crate::Prepared::state`], the pass-through surface of a statement reads
/// and writes it.
#[derive(Debug, Clone, Default)]
pub struct StatementState {
    pub bindings: Bindings,
    pub fetch_size: u32,
    pub fetch_direction: FetchDirection,
    /// Maximum number of rows a result set holds, `0` means unlimited.
    pub max_rows: u64,
    /// Maximum bytes returned for character and binary columns, `0` means unlimited.
    pub max_field_size: u32,
    pub query_timeout: Option<Duration>,
    pub escape_processing: bool,
    pub cursor_name: Option<String>,
    pub holdability: Holdability,
    pub poolable: bool,
    pub close_on_completion: bool,
    pub warnings: Vec<String>,
    pub result_set: Option<ResultSet>,
    pub update_count: Option<u64>,
    pub generated_keys: Option<ResultSet>,
    pub closed: bool,
    pub cancel: CancelToken,
}

impl StatementState {
    pub fn new(parameters: usize) -> Self {
        Self {
            bindings: Bindings::with_capacity(parameters),
            escape_processing: true,
            poolable: true,
            ..Default::default()
        }
    }
    /// Takes over the bindings, batch and settings of `other`.
    ///
    /// Results, warnings, the closed flag and the cancel token stay those of `self`.
    pub fn inherit(&mut self, other: &StatementState) -> Result<()> {
        self.bindings.inherit(&other.bindings)?;
        self.fetch_size = other.fetch_size;
        self.fetch_direction = other.fetch_direction;
        self.max_rows = other.max_rows;
        self.max_field_size = other.max_field_size;
        self.query_timeout = other.query_timeout;
        self.escape_processing = other.escape_processing;
        self.cursor_name.clone_from(&other.cursor_name);
        self.holdability = other.holdability;
        self.poolable = other.poolable;
        self.close_on_completion = other.close_on_completion;
        Ok(())
    }
    /// Forgets the outcome of the previous execution.
    pub fn reset_results(&mut self) {
        self.result_set = None;
        self.update_count = None;
        self.generated_keys = None;
    }
}
