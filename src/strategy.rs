use hatch_core::{CancelToken, Driver, Prepared, ResultSetMode};
use std::fmt::{self, Display};

/// The two interchangeable implementations a [`crate::PreparedStatement`] runs on.
pub enum Strategy<D: Driver> {
    /// Server prepare protocol, may report a prepare rejection.
    ServerAssisted(D::ServerPrepared),
    /// Client-side parameter substitution, never reports a prepare rejection.
    ClientEmulated(D::ClientPrepared),
}

/// Evaluates `$call` with `$s` bound to whichever statement `$strategy` holds.
macro_rules! dispatch {
    ($strategy:expr, $s:ident => $call:expr) => {
        match $strategy {
            $crate::Strategy::ServerAssisted($s) => $call,
            $crate::Strategy::ClientEmulated($s) => $call,
        }
    };
}
pub(crate) use dispatch;

impl<D: Driver> Strategy<D> {
    pub fn is_server_assisted(&self) -> bool {
        matches!(self, Strategy::ServerAssisted(..))
    }
    pub fn sql(&self) -> &str {
        dispatch!(self, s => s.sql())
    }
    pub fn mode(&self) -> ResultSetMode {
        dispatch!(self, s => s.mode())
    }
    pub fn connection(&self) -> &D::Connection {
        dispatch!(self, s => s.connection())
    }
    pub fn cancel_token(&self) -> CancelToken {
        dispatch!(self, s => s.cancel_token())
    }
}

impl<D: Driver> Display for Strategy<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, s => Display::fmt(s, f))
    }
}
