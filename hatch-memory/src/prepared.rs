use crate::{MemoryConnection, MemoryDriver, Response};
use hatch_core::{
    CancelToken, ClientPrepared, Connection, Driver, Error, GeneratedKeys, ParameterMetadata,
    Prepared, QueryParts, Result, ResultSet, ResultSetMetadata, ResultSetMode, ServerPrepared,
    SqlWriter, StatementError, StatementState, Value, is_prepare_rejected, log_error,
    truncate_long,
};
use std::fmt::{self, Display};

/// Adds the statement text to `error` and logs it. Prepare rejections are
/// expected to be recovered from, they are only logged at debug level.
fn report(error: Error, sql: &str) -> Error {
    let error = error.context(format!("While executing the statement:\n{}", truncate_long!(sql)));
    if is_prepare_rejected(&error) {
        log::debug!("{:#}", error);
        error
    } else {
        log_error!(error)
    }
}

fn check_open(state: &StatementState) -> Result<()> {
    if state.closed {
        return Err(StatementError::Closed.into());
    }
    Ok(())
}

/// Runs `sql` on the text protocol.
async fn query(connection: &MemoryConnection, state: &StatementState, sql: &str) -> Result<Response> {
    check_open(state)?;
    connection
        .request(&state.cancel, state.query_timeout, |server| server.query(sql))
        .await
        .map_err(|e| report(e, sql))
}

/// Stores the outcome of an execution, true when it is a result set.
fn record(state: &mut StatementState, response: Response, keys: bool) -> bool {
    state.reset_results();
    match response {
        Response::Rows(rows) => {
            state.result_set = Some(rows.limit(state.max_rows));
            true
        }
        Response::Affected {
            affected,
            generated,
        } => {
            state.update_count = Some(affected.rows_affected);
            if keys {
                state.generated_keys = Some(ResultSet::new(
                    ["GENERATED_KEY".to_string()].into(),
                    generated
                        .into_iter()
                        .map(|v| [Value::Int64(Some(v))].into())
                        .collect(),
                ));
            }
            false
        }
    }
}

fn query_outcome(state: &StatementState) -> Result<ResultSet> {
    state
        .result_set
        .clone()
        .ok_or_else(|| log_error!(Error::msg("The statement did not produce a result set")))
}

fn update_outcome(state: &StatementState) -> Result<u64> {
    if state.result_set.is_some() {
        return Err(log_error!(Error::msg(
            "The statement produced a result set, run it as a query"
        )));
    }
    Ok(state.update_count.unwrap_or_default())
}

fn batch_count(response: Response) -> Result<u64> {
    match response {
        Response::Affected { affected, .. } => Ok(affected.rows_affected),
        Response::Rows(..) => Err(log_error!(Error::msg(
            "A batch entry produced a result set"
        ))),
    }
}

/// Statement prepared on the memory server, parameters travel apart from the text.
///
/// The server prepare is deferred to the first execution or metadata request
/// unless the statement was built with `forced`.
#[derive(Debug)]
pub struct MemoryServerPrepared {
    connection: MemoryConnection,
    sql: String,
    mode: ResultSetMode,
    handle: Option<u32>,
    state: StatementState,
}

impl MemoryServerPrepared {
    /// Server handle, once prepared.
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }

    async fn prepared_handle(&mut self) -> Result<u32> {
        if let Some(handle) = self.handle {
            return Ok(handle);
        }
        let handle = self
            .connection
            .request(&self.state.cancel, None, |server| server.prepare(&self.sql))
            .await
            .map_err(|e| report(e, &self.sql))?;
        self.handle = Some(handle);
        Ok(handle)
    }

    async fn run(&mut self) -> Result<Response> {
        check_open(&self.state)?;
        let parameters = self
            .state
            .bindings
            .resolve()
            .map_err(|e| report(e, &self.sql))?;
        let handle = self.prepared_handle().await?;
        self.connection
            .request(&self.state.cancel, self.state.query_timeout, |server| {
                server.execute(handle, &parameters)
            })
            .await
            .map_err(|e| report(e, &self.sql))
    }

    async fn run_batch(&mut self) -> Result<Vec<u64>> {
        check_open(&self.state)?;
        let handle = self.prepared_handle().await?;
        let total = self.state.bindings.batch().len();
        let mut result = Vec::with_capacity(total);
        for parameters in self.state.bindings.batch() {
            let response = self
                .connection
                .request(&self.state.cancel, self.state.query_timeout, |server| {
                    server.execute(handle, parameters)
                })
                .await
                .map_err(|e| {
                    // Entries already applied must not run again on the client
                    if !result.is_empty() && is_prepare_rejected(&e) {
                        Error::msg(format!(
                            "The batch stopped after {} of {} entries: {:#}",
                            result.len(),
                            total,
                            e
                        ))
                    } else {
                        e
                    }
                })
                .map_err(|e| report(e, &self.sql))?;
            result.push(batch_count(response)?);
        }
        Ok(result)
    }
}

impl Prepared for MemoryServerPrepared {
    type Driver = MemoryDriver;

    fn sql(&self) -> &str {
        &self.sql
    }
    fn mode(&self) -> ResultSetMode {
        self.mode
    }
    fn connection(&self) -> &MemoryConnection {
        &self.connection
    }
    fn state(&self) -> &StatementState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut StatementState {
        &mut self.state
    }

    async fn execute(&mut self) -> Result<bool> {
        let response = self.run().await?;
        Ok(record(&mut self.state, response, true))
    }
    async fn execute_sql(&mut self, sql: &str, keys: GeneratedKeys) -> Result<bool> {
        let response = query(&self.connection, &self.state, sql).await?;
        Ok(record(&mut self.state, response, keys.requested()))
    }
    async fn execute_query(&mut self) -> Result<ResultSet> {
        self.execute().await?;
        query_outcome(&self.state)
    }
    async fn execute_query_sql(&mut self, sql: &str) -> Result<ResultSet> {
        self.execute_sql(sql, GeneratedKeys::None).await?;
        query_outcome(&self.state)
    }
    async fn execute_update(&mut self) -> Result<u64> {
        self.execute().await?;
        update_outcome(&self.state)
    }
    async fn execute_update_sql(&mut self, sql: &str, keys: GeneratedKeys) -> Result<u64> {
        self.execute_sql(sql, keys).await?;
        update_outcome(&self.state)
    }
    async fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let result = self.run_batch().await;
        // A batch rejected before its first entry is handed over whole to the client statement
        if !matches!(&result, Err(e) if is_prepare_rejected(e)) {
            self.state.bindings.clear_batch();
            self.state.reset_results();
        }
        result
    }
    async fn metadata(&mut self) -> Result<Option<ResultSetMetadata>> {
        check_open(&self.state)?;
        let handle = self.prepared_handle().await?;
        self.connection
            .request(&self.state.cancel, None, |server| {
                server.describe_prepared(handle)
            })
            .await
            .map_err(|e| report(e, &self.sql))
    }
    async fn parameter_metadata(&mut self) -> Result<ParameterMetadata> {
        check_open(&self.state)?;
        self.prepared_handle().await?;
        Ok(ParameterMetadata::untyped(
            self.state.bindings.parameter_count(),
        ))
    }
    async fn close(&mut self) -> Result<()> {
        if self.state.closed {
            return Ok(());
        }
        self.state.closed = true;
        if let Some(handle) = self.handle.take() {
            self.connection
                .request(&CancelToken::new(), None, |server| server.close(handle))
                .await?;
        }
        Ok(())
    }
}

impl ServerPrepared for MemoryServerPrepared {
    async fn prepare(
        connection: &MemoryConnection,
        sql: &str,
        mode: ResultSetMode,
        forced: bool,
    ) -> Result<Self> {
        let mut result = Self {
            connection: connection.clone(),
            sql: sql.to_string(),
            mode,
            handle: None,
            state: StatementState::new(QueryParts::new(sql).parameter_count()),
        };
        if forced {
            result.prepared_handle().await?;
        }
        Ok(result)
    }
}

impl Display for MemoryServerPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.handle {
            Some(handle) => write!(f, "MemoryServerPrepared #{}: {}", handle, self.sql),
            None => write!(f, "MemoryServerPrepared: {}", self.sql),
        }
    }
}

/// Statement whose parameters are written into the text as literals, sent on
/// the text protocol.
#[derive(Debug)]
pub struct MemoryClientPrepared {
    connection: MemoryConnection,
    sql: String,
    mode: ResultSetMode,
    parts: QueryParts,
    state: StatementState,
}

impl MemoryClientPrepared {
    /// The text sent to the server for `parameters`.
    pub fn render(&self, parameters: &[Value]) -> Result<String> {
        let mut out = String::with_capacity(self.sql.len() + 16 * parameters.len());
        self.connection
            .driver()
            .sql_writer()
            .write_query(&mut out, &self.parts, parameters)?;
        Ok(out)
    }

    async fn run(&self, parameters: &[Value]) -> Result<Response> {
        let sql = self.render(parameters).map_err(|e| report(e, &self.sql))?;
        query(&self.connection, &self.state, &sql).await
    }

    async fn run_batch(&mut self) -> Result<Vec<u64>> {
        check_open(&self.state)?;
        let batch = self.state.bindings.batch().to_vec();
        let mut result = Vec::with_capacity(batch.len());
        for parameters in batch {
            result.push(batch_count(self.run(&parameters).await?)?);
        }
        Ok(result)
    }
}

impl Prepared for MemoryClientPrepared {
    type Driver = MemoryDriver;

    fn sql(&self) -> &str {
        &self.sql
    }
    fn mode(&self) -> ResultSetMode {
        self.mode
    }
    fn connection(&self) -> &MemoryConnection {
        &self.connection
    }
    fn state(&self) -> &StatementState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut StatementState {
        &mut self.state
    }

    async fn execute(&mut self) -> Result<bool> {
        check_open(&self.state)?;
        let parameters = self
            .state
            .bindings
            .resolve()
            .map_err(|e| report(e, &self.sql))?;
        let response = self.run(&parameters).await?;
        Ok(record(&mut self.state, response, true))
    }
    async fn execute_sql(&mut self, sql: &str, keys: GeneratedKeys) -> Result<bool> {
        let response = query(&self.connection, &self.state, sql).await?;
        Ok(record(&mut self.state, response, keys.requested()))
    }
    async fn execute_query(&mut self) -> Result<ResultSet> {
        self.execute().await?;
        query_outcome(&self.state)
    }
    async fn execute_query_sql(&mut self, sql: &str) -> Result<ResultSet> {
        self.execute_sql(sql, GeneratedKeys::None).await?;
        query_outcome(&self.state)
    }
    async fn execute_update(&mut self) -> Result<u64> {
        self.execute().await?;
        update_outcome(&self.state)
    }
    async fn execute_update_sql(&mut self, sql: &str, keys: GeneratedKeys) -> Result<u64> {
        self.execute_sql(sql, keys).await?;
        update_outcome(&self.state)
    }
    async fn execute_batch(&mut self) -> Result<Vec<u64>> {
        let result = self.run_batch().await;
        self.state.bindings.clear_batch();
        self.state.reset_results();
        result
    }
    async fn metadata(&mut self) -> Result<Option<ResultSetMetadata>> {
        check_open(&self.state)?;
        self.connection
            .request(&self.state.cancel, None, |server| server.describe(&self.sql))
            .await
            .map_err(|e| report(e, &self.sql))
    }
    async fn parameter_metadata(&mut self) -> Result<ParameterMetadata> {
        check_open(&self.state)?;
        Ok(ParameterMetadata::untyped(self.parts.parameter_count()))
    }
    async fn close(&mut self) -> Result<()> {
        self.state.closed = true;
        Ok(())
    }
}

impl ClientPrepared for MemoryClientPrepared {
    fn new(connection: &MemoryConnection, sql: &str, mode: ResultSetMode) -> Result<Self> {
        let parts = QueryParts::new(sql);
        Ok(Self {
            connection: connection.clone(),
            sql: sql.to_string(),
            mode,
            state: StatementState::new(parts.parameter_count()),
            parts,
        })
    }
}

impl Display for MemoryClientPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryClientPrepared: {}", self.sql)
    }
}
