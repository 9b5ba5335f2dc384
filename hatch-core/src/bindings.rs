use crate::{Error, Result, Row, StatementError, Value};

/// Parameter values bound to a statement and the batch entries queued from them.
///
/// Indices start from 0. `bind` appends after the last explicitly bound index,
/// so `bind_index(v, 2)` followed by `bind(w)` places `w` at index 3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: Vec<Option<Value>>,
    cursor: u64,
    batch: Vec<Row>,
}

impl Bindings {
    /// Bindings for a statement with `count` placeholders.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            values: vec![None; count],
            cursor: 0,
            batch: Vec::new(),
        }
    }
    pub fn parameter_count(&self) -> usize {
        self.values.len()
    }
    pub fn set(&mut self, index: u64, value: Value) -> Result<()> {
        let len = self.values.len();
        let target = self.values.get_mut(index as usize).ok_or_else(|| {
            Error::msg(format!(
                "Index {index} cannot be bound, the query has only {len} parameters"
            ))
        })?;
        *target = Some(value);
        self.cursor = index + 1;
        Ok(())
    }
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.set(self.cursor, value)
    }
    pub fn get(&self, index: u64) -> Option<&Value> {
        self.values.get(index as usize).and_then(Option::as_ref)
    }
    /// Removes every bound value, the queued batch entries are kept.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
        self.cursor = 0;
    }
    /// The full parameter row, failing on the first unset placeholder.
    pub fn resolve(&self) -> Result<Row> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.clone()
                    .ok_or_else(|| StatementError::MissingParameter(i as u64).into())
            })
            .collect()
    }
    /// Snapshot the current values as a new batch entry.
    pub fn add_batch(&mut self) -> Result<()> {
        let row = self.resolve()?;
        self.batch.push(row);
        Ok(())
    }
    pub fn batch(&self) -> &[Row] {
        &self.batch
    }
    pub fn take_batch(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.batch)
    }
    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }
    /// Copies values and batch entries of `other` into `self`.
    ///
    /// Both sides must describe the same number of placeholders.
    pub fn inherit(&mut self, other: &Bindings) -> Result<()> {
        if other.values.len() != self.values.len() {
            return Err(Error::msg(format!(
                "Cannot carry over {} bound parameters into a statement with {} placeholders",
                other.values.len(),
                self.values.len()
            )));
        }
        self.values.clone_from(&other.values);
        self.cursor = other.cursor;
        self.batch.clone_from(&other.batch);
        Ok(())
    }
}
