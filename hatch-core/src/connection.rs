use crate::{Driver, Result, StatementOptions};
use std::{borrow::Cow, future::Future};

/// Shared handle to an established connection.
///
/// Cloning yields another handle to the same session: statements keep one to
/// reach the server, and the driver serializes their use of it.
pub trait Connection: Clone + Send + Sync + 'static {
    type Driver: Driver<Connection = Self>;

    /// Open a connection to the given URL, it must start with `<Driver::NAME>://`.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send;

    fn driver(&self) -> &Self::Driver;

    fn options(&self) -> &StatementOptions;
}
