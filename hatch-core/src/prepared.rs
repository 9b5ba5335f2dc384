use crate::{
    AsValue, CancelToken, Driver, Error, FetchDirection, GeneratedKeys, Holdability,
    ParameterMetadata, Result, ResultSet, ResultSetMetadata, ResultSetMode, StatementState, Value,
};
use std::{fmt::Display, future::Future, io::Read, time::Duration};

/// A parameterized statement bound to a connection: the capability set shared
/// by the server-side and client-side strategies.
///
/// The execute family is implemented by every driver. The rest of the surface
/// works on the [`StatementState`] and rarely needs overriding.
///
/// # Binding Semantics
/// * `bind` appends a value after the last bound index.
/// * `bind_index` sets the parameter at `index` (from 0).
///
/// Binding methods return `&mut Self` for fluent chaining:
/// ```rust,ignore
/// prepared.bind(42)?.bind("hello")?;
/// ```
pub trait Prepared: Send + Sync + Display {
    type Driver: Driver;

    fn sql(&self) -> &str;
    fn mode(&self) -> ResultSetMode;
    fn connection(&self) -> &<Self::Driver as Driver>::Connection;
    fn state(&self) -> &StatementState;
    fn state_mut(&mut self) -> &mut StatementState;

    /// Execute with the bound parameters, true when the outcome is a result set.
    fn execute(&mut self) -> impl Future<Output = Result<bool>> + Send;
    /// Execute `sql` as given, ignoring the statement text and its parameters.
    fn execute_sql(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> impl Future<Output = Result<bool>> + Send;
    fn execute_query(&mut self) -> impl Future<Output = Result<ResultSet>> + Send;
    fn execute_query_sql(&mut self, sql: &str) -> impl Future<Output = Result<ResultSet>> + Send;
    fn execute_update(&mut self) -> impl Future<Output = Result<u64>> + Send;
    fn execute_update_sql(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> impl Future<Output = Result<u64>> + Send;
    /// Run every queued batch entry, returning the update count of each.
    fn execute_batch(&mut self) -> impl Future<Output = Result<Vec<u64>>> + Send;
    /// Shape of the rows the statement produces, `None` when it produces none.
    fn metadata(&mut self) -> impl Future<Output = Result<Option<ResultSetMetadata>>> + Send;
    fn parameter_metadata(&mut self) -> impl Future<Output = Result<ParameterMetadata>> + Send;
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Remove all the previously bound values.
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.state_mut().bindings.clear();
        Ok(self)
    }
    /// Append a parameter value.
    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        self.state_mut().bindings.push(value.as_value())?;
        Ok(self)
    }
    /// Bind a value at a specific index.
    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        self.state_mut().bindings.set(index, value.as_value())?;
        Ok(self)
    }
    /// Bind a NULL carrying the SQL type of `ty`.
    fn bind_null(&mut self, index: u64, ty: &Value) -> Result<&mut Self> {
        self.bind_index(ty.as_null(), index)
    }
    /// Bind the content of `reader` as a blob, reading at most `length` bytes when given.
    fn bind_stream(
        &mut self,
        index: u64,
        reader: impl Read,
        length: Option<u64>,
    ) -> Result<&mut Self> {
        let mut data = Vec::new();
        let mut reader = reader.take(length.unwrap_or(u64::MAX));
        reader.read_to_end(&mut data).map_err(|e| {
            Error::new(e).context(format!("Cannot read the stream bound to parameter {index}"))
        })?;
        self.bind_index(data, index)
    }
    /// Queue the current bindings as a batch entry.
    fn add_batch(&mut self) -> Result<()> {
        self.state_mut().bindings.add_batch()
    }
    fn clear_batch(&mut self) {
        self.state_mut().bindings.clear_batch();
    }

    /// The result set of the last execution, handed out once.
    fn result_set(&mut self) -> Option<ResultSet> {
        self.state_mut().result_set.take()
    }
    fn update_count(&self) -> Option<u64> {
        self.state().update_count
    }
    /// Move past the current result, statements here produce one result only.
    fn more_results(&mut self) -> bool {
        self.state_mut().reset_results();
        false
    }
    fn generated_keys(&self) -> ResultSet {
        self.state().generated_keys.clone().unwrap_or_default()
    }

    fn fetch_size(&self) -> u32 {
        self.state().fetch_size
    }
    fn set_fetch_size(&mut self, rows: u32) {
        self.state_mut().fetch_size = rows;
    }
    fn fetch_direction(&self) -> FetchDirection {
        self.state().fetch_direction
    }
    fn set_fetch_direction(&mut self, direction: FetchDirection) {
        self.state_mut().fetch_direction = direction;
    }
    fn max_rows(&self) -> u64 {
        self.state().max_rows
    }
    fn set_max_rows(&mut self, max: u64) {
        self.state_mut().max_rows = max;
    }
    fn max_field_size(&self) -> u32 {
        self.state().max_field_size
    }
    fn set_max_field_size(&mut self, max: u32) {
        self.state_mut().max_field_size = max;
    }
    fn query_timeout(&self) -> Option<Duration> {
        self.state().query_timeout
    }
    fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.state_mut().query_timeout = timeout;
    }
    fn set_escape_processing(&mut self, enable: bool) {
        self.state_mut().escape_processing = enable;
    }
    fn set_cursor_name(&mut self, name: Option<String>) {
        self.state_mut().cursor_name = name;
    }
    fn holdability(&self) -> Holdability {
        self.state().holdability
    }

    fn warnings(&self) -> &[String] {
        &self.state().warnings
    }
    fn clear_warnings(&mut self) {
        self.state_mut().warnings.clear();
    }

    fn is_poolable(&self) -> bool {
        self.state().poolable
    }
    fn set_poolable(&mut self, poolable: bool) {
        self.state_mut().poolable = poolable;
    }
    fn close_on_completion(&mut self) {
        self.state_mut().close_on_completion = true;
    }
    fn is_close_on_completion(&self) -> bool {
        self.state().close_on_completion
    }

    fn is_closed(&self) -> bool {
        self.state().closed
    }
    /// Ask the running execution to stop.
    ///
    /// The request stays armed until an execution observes it, callers that
    /// run executions disarm it in between.
    fn cancel(&self) {
        self.state().cancel.cancel();
    }
    fn cancel_token(&self) -> CancelToken {
        self.state().cancel.clone()
    }
}

/// Statement relying on the server prepare protocol.
///
/// Its execute family and metadata calls may fail with
/// [`crate::PrepareRejected`] when the server refuses to prepare the text.
pub trait ServerPrepared: Prepared + Sized {
    /// Build a statement for `sql`.
    ///
    /// With `forced` the caller asked for this statement directly and the
    /// server prepare happens right away, otherwise it is deferred to the first
    /// execution or metadata request.
    fn prepare(
        connection: &<Self::Driver as Driver>::Connection,
        sql: &str,
        mode: ResultSetMode,
        forced: bool,
    ) -> impl Future<Output = Result<Self>> + Send;
}

/// Statement substituting its parameters into the SQL text, it never fails
/// with [`crate::PrepareRejected`].
pub trait ClientPrepared: Prepared + Sized {
    fn new(
        connection: &<Self::Driver as Driver>::Connection,
        sql: &str,
        mode: ResultSetMode,
    ) -> Result<Self>;

    /// Take over the bindings, queued batch and settings of the server
    /// statement this one replaces.
    fn initialize_fallback(
        &mut self,
        server: &<Self::Driver as Driver>::ServerPrepared,
    ) -> Result<()> {
        self.state_mut().inherit(server.state())
    }
}
