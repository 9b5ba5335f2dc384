use crate::{ClientPrepared, Connection, Result, ServerPrepared, SqlWriter};
use std::{borrow::Cow, future::Future};

/// Entry point of a backend: names the connection and the two statement strategies it offers.
pub trait Driver: Sized + Send + Sync + 'static {
    type Connection: Connection<Driver = Self>;
    /// Statement relying on the server prepare protocol.
    type ServerPrepared: ServerPrepared<Driver = Self>;
    /// Statement substituting parameters into the SQL text on the client.
    type ClientPrepared: ClientPrepared<Driver = Self>;
    type SqlWriter: SqlWriter;

    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    fn connect(&self, url: Cow<'static, str>) -> impl Future<Output = Result<Self::Connection>> {
        Self::Connection::connect(url)
    }
}
