use crate::{
    engine::{Engine, Response},
    parser::{Parsed, parse, split_statements},
};
use hatch_core::{
    Error, PrepareRejected, Result, ResultSetMetadata, Row, Value, consume_while,
    for_each_code_char, is_multi_statement,
};
use std::{collections::BTreeMap, time::Duration};

/// Conditions under which the server refuses to prepare a statement.
///
/// Multi-statement text is always refused, like servers that support it only
/// on the text protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparePolicy {
    /// Refuse every prepare.
    pub reject_all: bool,
    /// Leading keywords of the statements refused, compared ignoring case.
    pub reject_keywords: Vec<String>,
    /// Maximum number of statements prepared at the same time.
    pub max_prepared: Option<usize>,
}

impl PreparePolicy {
    /// Reads the `reject_prepare` option: `all` or a comma separated list of keywords.
    pub fn reject(mut self, value: &str) -> Self {
        for keyword in value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
            if keyword.eq_ignore_ascii_case("all") {
                self.reject_all = true;
            } else {
                self.reject_keywords.push(keyword.to_string());
            }
        }
        self
    }

    /// The reason `sql` is refused while `open` statements are prepared, if it is.
    pub fn rejection(&self, sql: &str, open: usize) -> Option<String> {
        if self.reject_all {
            return Some("Server side prepare is disabled".into());
        }
        let keyword = leading_keyword(sql);
        if is_multi_statement(sql)
            || self
                .reject_keywords
                .iter()
                .any(|v| v.eq_ignore_ascii_case(keyword))
        {
            return Some(
                "This command is not supported in the prepared statement protocol yet".into(),
            );
        }
        if let Some(max) = self.max_prepared.filter(|max| open >= *max) {
            return Some(format!(
                "Can't create more than max_prepared_stmt_count statements (current value: {max})"
            ));
        }
        None
    }
}

fn leading_keyword(sql: &str) -> &str {
    let mut start = None;
    for_each_code_char(sql, |i, c| {
        if start.is_none() && !c.is_whitespace() {
            start = Some(i);
        }
    });
    let mut rest = start.map(|i| &sql[i..]).unwrap_or_default();
    consume_while(&mut rest, |c| c.is_alphanumeric() || c == '_')
}

/// A request received by the server, as recorded in its history.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Prepare(String),
    Execute { handle: u32, parameters: Row },
    Query(String),
    Describe(String),
    Close(u32),
}

#[derive(Debug)]
struct Handle {
    sql: String,
    parsed: Parsed,
    stale: bool,
}

/// The server behind every clone of a [`crate::MemoryConnection`].
///
/// Besides running statements it keeps the history of the latest requests it
/// received, at most [`MemoryServer::HISTORY_LIMIT`], and lets tests change its
/// behavior while statements are alive.
#[derive(Debug, Default)]
pub struct MemoryServer {
    engine: Engine,
    policy: PreparePolicy,
    handles: BTreeMap<u32, Handle>,
    last_handle: u32,
    history: Vec<Request>,
    latency: Duration,
}

impl MemoryServer {
    pub const HISTORY_LIMIT: usize = 1024;

    pub fn new(policy: PreparePolicy, latency: Duration) -> Self {
        Self {
            policy,
            latency,
            ..Default::default()
        }
    }
    pub fn policy(&self) -> &PreparePolicy {
        &self.policy
    }
    pub fn set_policy(&mut self, policy: PreparePolicy) {
        self.policy = policy;
    }
    /// Time every request waits before being served.
    pub fn latency(&self) -> Duration {
        self.latency
    }
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }
    pub fn history(&self) -> &[Request] {
        &self.history
    }
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
    fn record(&mut self, request: Request) {
        if self.history.len() >= Self::HISTORY_LIMIT {
            self.history.drain(..Self::HISTORY_LIMIT / 2);
        }
        self.history.push(request);
    }
    /// Number of statements currently prepared.
    pub fn open_prepared(&self) -> usize {
        self.handles.len()
    }
    /// Makes every prepared statement unusable, their next execution is refused
    /// as if the server had lost them.
    pub fn invalidate_prepared(&mut self) {
        self.handles.values_mut().for_each(|v| v.stale = true);
    }

    pub fn prepare(&mut self, sql: &str) -> Result<u32> {
        self.record(Request::Prepare(sql.to_string()));
        if let Some(reason) = self.policy.rejection(sql, self.handles.len()) {
            return Err(PrepareRejected::new(reason).into());
        }
        let parsed = parse(sql)?;
        self.last_handle += 1;
        self.handles.insert(
            self.last_handle,
            Handle {
                sql: sql.to_string(),
                parsed,
                stale: false,
            },
        );
        Ok(self.last_handle)
    }

    fn handle(&self, handle: u32) -> Result<&Handle> {
        let result = self.handles.get(&handle).ok_or_else(|| {
            Error::msg(format!(
                "Unknown prepared statement handler ({handle}) given to execute"
            ))
        })?;
        if result.stale {
            return Err(PrepareRejected::new("Prepared statement needs to be re-prepared").into());
        }
        Ok(result)
    }

    pub fn execute(&mut self, handle: u32, parameters: &[Value]) -> Result<Response> {
        self.record(Request::Execute {
            handle,
            parameters: parameters.into(),
        });
        let statement = self.handle(handle)?;
        let parsed = statement.parsed.clone();
        self.engine.execute(&parsed, parameters)
    }

    pub fn describe_prepared(&mut self, handle: u32) -> Result<Option<ResultSetMetadata>> {
        let statement = self.handle(handle)?;
        let sql = statement.sql.clone();
        let result = self.engine.describe(&statement.parsed);
        self.record(Request::Describe(sql));
        result
    }

    /// Runs a text query, statements separated by `;` run in order and the
    /// response is the one of the last.
    pub fn query(&mut self, sql: &str) -> Result<Response> {
        self.record(Request::Query(sql.to_string()));
        let mut response = None;
        for statement in split_statements(sql) {
            let parsed = parse(statement)?;
            if parsed.parameters > 0 {
                return Err(Error::msg(
                    "Placeholders can only be used in prepared statements",
                ));
            }
            response = Some(self.engine.execute(&parsed, &[])?);
        }
        response.ok_or_else(|| Error::msg("Query was empty"))
    }

    /// Describes the result of `sql` without running it or preparing it.
    pub fn describe(&mut self, sql: &str) -> Result<Option<ResultSetMetadata>> {
        self.record(Request::Describe(sql.to_string()));
        self.engine.describe(&parse(sql)?)
    }

    /// Releases a prepared statement, unknown handles are ignored.
    pub fn close(&mut self, handle: u32) -> Result<()> {
        self.record(Request::Close(handle));
        self.handles.remove(&handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatch_core::is_prepare_rejected;

    #[test]
    fn policy() {
        let policy = PreparePolicy {
            max_prepared: Some(2),
            ..Default::default()
        }
        .reject(" call, LOAD ,");
        assert_eq!(policy.reject_keywords, ["call", "LOAD"]);
        assert!(policy.rejection("SELECT 1", 0).is_none());
        assert!(policy.rejection("/* x */ CALL p(?)", 0).is_some());
        assert!(policy.rejection("load data infile 'x'", 0).is_some());
        assert!(policy.rejection("SELECT 1; SELECT 2", 0).is_some());
        assert!(policy.rejection("SELECT ';'", 0).is_none());
        assert!(policy.rejection("SELECT 1", 2).is_some());
        assert!(PreparePolicy::default().reject("ALL").reject_all);
    }

    #[test]
    fn prepare_and_execute() {
        let mut server = MemoryServer::default();
        server.query("CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
        let handle = server.prepare("INSERT INTO t VALUES (?)").unwrap();
        assert_eq!(server.open_prepared(), 1);
        server.execute(handle, &[Value::Int32(Some(1))]).unwrap();
        assert!(server.execute(handle, &[]).is_err());

        server.invalidate_prepared();
        let error = server.execute(handle, &[Value::Int32(Some(2))]).unwrap_err();
        assert!(is_prepare_rejected(&error));

        server.close(handle).unwrap();
        assert_eq!(server.open_prepared(), 0);
        let error = server.execute(handle, &[Value::Int32(Some(2))]).unwrap_err();
        assert!(!is_prepare_rejected(&error));
    }

    #[test]
    fn rejection_is_not_a_syntax_error() {
        let mut server = MemoryServer::new(PreparePolicy::default().reject("insert"), Duration::ZERO);
        let error = server.prepare("INSERT INTO t VALUES (?)").unwrap_err();
        assert!(is_prepare_rejected(&error));
        let error = server.prepare("SELEC * FROM t").unwrap_err();
        assert!(!is_prepare_rejected(&error));
        assert_eq!(
            server.history(),
            [
                Request::Prepare("INSERT INTO t VALUES (?)".into()),
                Request::Prepare("SELEC * FROM t".into()),
            ]
        );
    }

    #[test]
    fn history_is_bounded() {
        let mut server = MemoryServer::new(PreparePolicy::default().reject("all"), Duration::ZERO);
        for i in 0..MemoryServer::HISTORY_LIMIT + 10 {
            let _ = server.prepare(&format!("SELECT {i}"));
        }
        assert!(server.history().len() <= MemoryServer::HISTORY_LIMIT);
        assert_eq!(
            server.history().last(),
            Some(&Request::Prepare(format!(
                "SELECT {}",
                MemoryServer::HISTORY_LIMIT + 9
            )))
        );
        server.clear_history();
        assert!(server.history().is_empty());
    }

    #[test]
    fn text_queries() {
        let mut server = MemoryServer::default();
        let response = server
            .query("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('a;b'); SELECT * FROM t")
            .unwrap();
        let Response::Rows(rows) = response else {
            panic!("Expected rows");
        };
        assert_eq!(rows.rows, [Row::from([Value::Varchar(Some("a;b".into()))])]);
        assert!(server.query("SELECT * FROM t WHERE v = ?").is_err());
        assert!(server.query(" -- nothing").is_err());
    }
}
