use crate::{PreparedStatement, Strategy};
use hatch_core::{
    ClientPrepared, Context, Driver, Error, Prepared, Result, is_prepare_rejected, truncate_long,
};
use std::mem;

/// Classification of a strategy call as seen by the failover controller.
pub(crate) enum Outcome<T> {
    Done(T),
    /// The server refused to prepare the statement.
    Rejected(Error),
    Failed(Error),
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(value: Result<T>) -> Self {
        match value {
            Ok(v) => Outcome::Done(v),
            Err(e) if is_prepare_rejected(&e) => Outcome::Rejected(e),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Runs `$call` on the active strategy of `$self`. On a prepare rejection the
/// statement fails over to the client strategy and `$call` runs once more,
/// whatever that second run returns is the result.
///
/// Cancel requests only count while the call runs: one left over from an idle
/// statement is dropped when the call starts, one the call did not observe is
/// dropped when it ends.
macro_rules! with_failover {
    ($self:ident, $s:ident => $call:expr) => {{
        $self.disarm_cancel();
        let result = match $crate::failover::Outcome::from($crate::strategy::dispatch!(
            &mut $self.active, $s => $call
        )) {
            $crate::failover::Outcome::Done(value) => Ok(value),
            $crate::failover::Outcome::Failed(error) => Err(error),
            $crate::failover::Outcome::Rejected(rejection) => {
                match $self.fail_over(rejection).await {
                    Ok(()) => $crate::strategy::dispatch!(&mut $self.active, $s => $call),
                    Err(error) => Err(error),
                }
            }
        };
        $self.disarm_cancel();
        result
    }};
}
pub(crate) use with_failover;

impl<D: Driver> PreparedStatement<D> {
    /// Replaces the server strategy with a client one carrying the same
    /// bindings, batch and settings.
    ///
    /// Leaves the statement untouched when the client strategy cannot be built.
    /// A statement already on the client strategy hands `rejection` back.
    pub(crate) async fn fail_over(&mut self, rejection: Error) -> Result<()> {
        let Strategy::ServerAssisted(server) = &self.active else {
            return Err(rejection);
        };
        log::debug!(
            "Switching to client side prepare for `{}`: {:#}",
            truncate_long!(server.sql()),
            rejection
        );
        let client = D::ClientPrepared::new(server.connection(), server.sql(), server.mode())
            .and_then(|mut client| {
                client.initialize_fallback(server)?;
                Ok(client)
            })
            .with_context(|| {
                format!(
                    "While switching to client side prepare after: {}",
                    rejection
                )
            })?;
        let previous = self.replace(Strategy::ClientEmulated(client));
        if let Strategy::ServerAssisted(mut server) = previous {
            if self.options.release_on_failover {
                if let Err(e) = server.close().await {
                    log::warn!("Could not release the rejected server statement: {:#}", e);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn disarm_cancel(&self) {
        self.cancel.lock().take();
    }

    /// Installs `next` as the active strategy and returns the previous one.
    pub(crate) fn replace(&mut self, next: Strategy<D>) -> Strategy<D> {
        let mut current = self.cancel.lock();
        let previous = mem::replace(&mut self.active, next);
        let token = self.active.cancel_token();
        // A cancel that came in while switching belongs to the retried call.
        if current.take() {
            token.cancel();
        }
        *current = token;
        self.server_assisted = self.active.is_server_assisted();
        previous
    }
}
