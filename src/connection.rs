use crate::PreparedStatement;
use hatch_core::{Connection, ResultSetMode, Result};
use std::future::Future;

/// Prepared statements straight from a connection handle.
pub trait ConnectionExt: Connection {
    /// Prepare `sql` with forward-only, read-only result sets.
    fn prepare(&self, sql: &str) -> impl Future<Output = Result<PreparedStatement<Self::Driver>>> {
        PreparedStatement::prepare(self, sql, ResultSetMode::default())
    }

    fn prepare_with_mode(
        &self,
        sql: &str,
        mode: ResultSetMode,
    ) -> impl Future<Output = Result<PreparedStatement<Self::Driver>>> {
        PreparedStatement::prepare(self, sql, mode)
    }
}

impl<C: Connection> ConnectionExt for C {}
