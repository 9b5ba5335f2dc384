use crate::{
    CancelHandle, Strategy,
    cancel::CancelSlot,
    failover::with_failover,
    strategy::dispatch,
};
use hatch_core::{
    AsValue, ClientPrepared, Connection, Driver, Error, FetchDirection, GeneratedKeys, Holdability,
    ParameterMetadata, Prepared, Result, ResultSet, ResultSetMetadata, ResultSetMode,
    ServerPrepared, StatementError, StatementOptions, Value,
};
use parking_lot::Mutex;
use std::{
    fmt::{self, Display},
    io::Read,
    sync::Arc,
    time::Duration,
};

/// A prepared statement that starts on the server prepare protocol and moves
/// to client-side parameter substitution the first time the server refuses
/// to prepare it.
///
/// The switch happens at most once and is invisible to the caller: the call
/// that met the refusal is run again on the client strategy, with every
/// parameter and batch entry bound so far carried over.
///
/// ```rust,ignore
/// let mut statement = PreparedStatement::prepare(&connection, "INSERT INTO t VALUES (?)", Default::default()).await?;
/// statement.bind(5)?;
/// let rows = statement.execute_update().await?;
/// ```
pub struct PreparedStatement<D: Driver> {
    pub(crate) active: Strategy<D>,
    pub(crate) server_assisted: bool,
    pub(crate) options: StatementOptions,
    pub(crate) cancel: CancelSlot,
}

impl<D: Driver> PreparedStatement<D> {
    /// Prepare `sql` on `connection`.
    ///
    /// The server prepare itself is deferred to the first execution. With the
    /// `server_prepare` connection option turned off the statement is
    /// client-side from the start.
    pub async fn prepare(
        connection: &D::Connection,
        sql: &str,
        mode: ResultSetMode,
    ) -> Result<Self> {
        let options = *connection.options();
        let active = if options.server_prepare {
            Strategy::ServerAssisted(D::ServerPrepared::prepare(connection, sql, mode, false).await?)
        } else {
            Strategy::ClientEmulated(D::ClientPrepared::new(connection, sql, mode)?)
        };
        Ok(Self::with_strategy(active, options))
    }

    /// Wrap an already built strategy.
    pub fn with_strategy(active: Strategy<D>, options: StatementOptions) -> Self {
        let cancel = Arc::new(Mutex::new(active.cancel_token()));
        Self {
            server_assisted: active.is_server_assisted(),
            active,
            options,
            cancel,
        }
    }

    /// False once the statement switched to client-side substitution.
    pub fn is_server_assisted(&self) -> bool {
        self.server_assisted
    }
    pub fn strategy(&self) -> &Strategy<D> {
        &self.active
    }
    pub fn server_prepared(&self) -> Option<&D::ServerPrepared> {
        match &self.active {
            Strategy::ServerAssisted(v) => Some(v),
            Strategy::ClientEmulated(..) => None,
        }
    }
    pub fn client_prepared(&self) -> Option<&D::ClientPrepared> {
        match &self.active {
            Strategy::ServerAssisted(..) => None,
            Strategy::ClientEmulated(v) => Some(v),
        }
    }
    pub fn sql(&self) -> &str {
        self.active.sql()
    }
    pub fn mode(&self) -> ResultSetMode {
        self.active.mode()
    }
    pub fn connection(&self) -> &D::Connection {
        self.active.connection()
    }

    pub async fn execute(&mut self) -> Result<bool> {
        with_failover!(self, s => s.execute().await)
    }
    pub async fn execute_sql(&mut self, sql: &str) -> Result<bool> {
        with_failover!(self, s => s.execute_sql(sql, GeneratedKeys::None).await)
    }
    pub async fn execute_sql_returning(&mut self, sql: &str, keys: GeneratedKeys) -> Result<bool> {
        with_failover!(self, s => s.execute_sql(sql, keys.clone()).await)
    }
    pub async fn execute_query(&mut self) -> Result<ResultSet> {
        with_failover!(self, s => s.execute_query().await)
    }
    pub async fn execute_query_sql(&mut self, sql: &str) -> Result<ResultSet> {
        with_failover!(self, s => s.execute_query_sql(sql).await)
    }
    pub async fn execute_update(&mut self) -> Result<u64> {
        with_failover!(self, s => s.execute_update().await)
    }
    pub async fn execute_update_sql(&mut self, sql: &str) -> Result<u64> {
        with_failover!(self, s => s.execute_update_sql(sql, GeneratedKeys::None).await)
    }
    pub async fn execute_update_sql_returning(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64> {
        with_failover!(self, s => s.execute_update_sql(sql, keys.clone()).await)
    }
    pub async fn execute_batch(&mut self) -> Result<Vec<u64>> {
        with_failover!(self, s => s.execute_batch().await)
    }
    pub async fn metadata(&mut self) -> Result<Option<ResultSetMetadata>> {
        with_failover!(self, s => s.metadata().await)
    }
    pub async fn parameter_metadata(&mut self) -> Result<ParameterMetadata> {
        with_failover!(self, s => s.parameter_metadata().await)
    }

    pub fn clear_parameters(&mut self) -> Result<&mut Self> {
        dispatch!(&mut self.active, s => { s.clear_bindings()?; });
        Ok(self)
    }
    pub fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        dispatch!(&mut self.active, s => { s.bind(value)?; });
        Ok(self)
    }
    pub fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        dispatch!(&mut self.active, s => { s.bind_index(value, index)?; });
        Ok(self)
    }
    pub fn bind_null(&mut self, index: u64, ty: &Value) -> Result<&mut Self> {
        dispatch!(&mut self.active, s => { s.bind_null(index, ty)?; });
        Ok(self)
    }
    pub fn bind_stream(
        &mut self,
        index: u64,
        reader: impl Read,
        length: Option<u64>,
    ) -> Result<&mut Self> {
        dispatch!(&mut self.active, s => { s.bind_stream(index, reader, length)?; });
        Ok(self)
    }
    pub fn add_batch(&mut self) -> Result<()> {
        dispatch!(&mut self.active, s => s.add_batch())
    }
    /// Always fails: the batch of a prepared statement is made of its own
    /// parameter sets, not of arbitrary SQL.
    pub fn add_batch_sql(&mut self, _sql: &str) -> Result<()> {
        Err(Error::new(StatementError::Unsupported("add_batch_sql")))
    }
    pub fn clear_batch(&mut self) {
        dispatch!(&mut self.active, s => s.clear_batch())
    }

    pub fn result_set(&mut self) -> Option<ResultSet> {
        dispatch!(&mut self.active, s => s.result_set())
    }
    pub fn update_count(&self) -> Option<u64> {
        dispatch!(&self.active, s => s.update_count())
    }
    pub fn more_results(&mut self) -> bool {
        dispatch!(&mut self.active, s => s.more_results())
    }
    pub fn generated_keys(&self) -> ResultSet {
        dispatch!(&self.active, s => s.generated_keys())
    }

    pub fn fetch_size(&self) -> u32 {
        dispatch!(&self.active, s => s.fetch_size())
    }
    pub fn set_fetch_size(&mut self, rows: u32) {
        dispatch!(&mut self.active, s => s.set_fetch_size(rows))
    }
    pub fn fetch_direction(&self) -> FetchDirection {
        dispatch!(&self.active, s => s.fetch_direction())
    }
    pub fn set_fetch_direction(&mut self, direction: FetchDirection) {
        dispatch!(&mut self.active, s => s.set_fetch_direction(direction))
    }
    pub fn max_rows(&self) -> u64 {
        dispatch!(&self.active, s => s.max_rows())
    }
    pub fn set_max_rows(&mut self, max: u64) {
        dispatch!(&mut self.active, s => s.set_max_rows(max))
    }
    pub fn max_field_size(&self) -> u32 {
        dispatch!(&self.active, s => s.max_field_size())
    }
    pub fn set_max_field_size(&mut self, max: u32) {
        dispatch!(&mut self.active, s => s.set_max_field_size(max))
    }
    pub fn query_timeout(&self) -> Option<Duration> {
        dispatch!(&self.active, s => s.query_timeout())
    }
    pub fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        dispatch!(&mut self.active, s => s.set_query_timeout(timeout))
    }
    pub fn set_escape_processing(&mut self, enable: bool) {
        dispatch!(&mut self.active, s => s.set_escape_processing(enable))
    }
    pub fn set_cursor_name(&mut self, name: Option<String>) {
        dispatch!(&mut self.active, s => s.set_cursor_name(name))
    }
    pub fn holdability(&self) -> Holdability {
        dispatch!(&self.active, s => s.holdability())
    }

    pub fn warnings(&self) -> &[String] {
        dispatch!(&self.active, s => s.warnings())
    }
    pub fn clear_warnings(&mut self) {
        dispatch!(&mut self.active, s => s.clear_warnings())
    }

    pub fn is_poolable(&self) -> bool {
        dispatch!(&self.active, s => s.is_poolable())
    }
    pub fn set_poolable(&mut self, poolable: bool) {
        dispatch!(&mut self.active, s => s.set_poolable(poolable))
    }
    pub fn close_on_completion(&mut self) {
        dispatch!(&mut self.active, s => s.close_on_completion())
    }
    pub fn is_close_on_completion(&self) -> bool {
        dispatch!(&self.active, s => s.is_close_on_completion())
    }

    pub async fn close(&mut self) -> Result<()> {
        dispatch!(&mut self.active, s => s.close().await)
    }
    pub fn is_closed(&self) -> bool {
        dispatch!(&self.active, s => s.is_closed())
    }
    /// Cancel the execution in flight on the active strategy, ignored when
    /// nothing runs. A running call is reached through [`Self::cancel_handle`].
    pub fn cancel(&self) {
        let _slot = self.cancel.lock();
        dispatch!(&self.active, s => s.cancel())
    }
    /// Handle to cancel executions of this statement from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            slot: self.cancel.clone(),
        }
    }
}

impl<D: Driver> Display for PreparedStatement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.active, f)
    }
}
