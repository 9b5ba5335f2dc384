use crate::{MemoryDriver, MemoryServer, PreparePolicy};
use hatch_core::{
    CancelToken, Connection, Context, Driver, Error, Result, StatementError, StatementOptions,
    log_error, parse_option, truncate_long,
};
use std::{borrow::Cow, sync::Arc, time::Duration};
use tokio::sync::{Mutex, MutexGuard};
use url::Url;

/// Connection to an in-process server.
///
/// Clones share the server. Requests are served one at a time, each after
/// the latency configured on the server.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    server: Arc<Mutex<MemoryServer>>,
    options: StatementOptions,
}

impl MemoryConnection {
    pub const MAX_PREPARED: &'static str = "max_prepared";
    pub const REJECT_PREPARE: &'static str = "reject_prepare";
    pub const LATENCY_MS: &'static str = "latency_ms";

    pub fn new(server: MemoryServer, options: StatementOptions) -> Self {
        Self {
            server: Arc::new(Mutex::new(server)),
            options,
        }
    }

    /// Exclusive access to the server, to inspect it or change its behavior.
    pub async fn server(&self) -> MutexGuard<'_, MemoryServer> {
        self.server.lock().await
    }

    /// Serves `f` once the server is free and its latency elapsed.
    ///
    /// A cancel armed on `cancel`, before or during the wait, interrupts the
    /// request and is consumed. A `timeout` shorter than the latency fails it.
    pub(crate) async fn request<T>(
        &self,
        cancel: &CancelToken,
        timeout: Option<Duration>,
        f: impl FnOnce(&mut MemoryServer) -> Result<T> + Send,
    ) -> Result<T> {
        let mut server = self.server.lock().await;
        if cancel.take() {
            return Err(StatementError::Interrupted.into());
        }
        let latency = server.latency();
        if !latency.is_zero() {
            let (delay, expired) = match timeout {
                Some(limit) if !limit.is_zero() && limit < latency => (limit, true),
                _ => (latency, false),
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    cancel.take();
                    return Err(StatementError::Interrupted.into());
                }
            }
            if expired {
                return Err(Error::msg(format!(
                    "Query execution was interrupted, maximum statement execution time of {:?} exceeded",
                    delay
                )));
            }
        }
        f(&mut server)
    }
}

impl Connection for MemoryConnection {
    type Driver = MemoryDriver;

    async fn connect(url: Cow<'static, str>) -> Result<MemoryConnection> {
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        if !url.starts_with(&prefix) {
            return Err(log_error!(Error::msg(format!(
                "Expected memory connection url to start with `{}`",
                &prefix
            ))));
        }
        let context = || format!("Error while decoding connection URL: `{}`", truncate_long!(url));
        let parsed = Url::parse(&url)
            .with_context(context)
            .map_err(|e| log_error!(e))?;
        let options = StatementOptions::from_url(&parsed)
            .with_context(context)
            .map_err(|e| log_error!(e))?;
        let mut policy = PreparePolicy::default();
        let mut latency = Duration::ZERO;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                Self::MAX_PREPARED => {
                    policy.max_prepared = Some(
                        parse_option(&key, &value)
                            .with_context(context)
                            .map_err(|e| log_error!(e))?,
                    );
                }
                Self::REJECT_PREPARE => policy = policy.reject(&value),
                Self::LATENCY_MS => {
                    latency = Duration::from_millis(
                        parse_option(&key, &value)
                            .with_context(context)
                            .map_err(|e| log_error!(e))?,
                    );
                }
                StatementOptions::SERVER_PREPARE | StatementOptions::RELEASE_ON_FAILOVER => {}
                _ => log::warn!("Ignoring unknown memory connection option `{}`", key),
            }
        }
        log::debug!(
            "Connected to a memory server with {:?}, {:?} and latency {:?}",
            options,
            policy,
            latency
        );
        Ok(Self::new(MemoryServer::new(policy, latency), options))
    }

    fn driver(&self) -> &MemoryDriver {
        &MemoryDriver {}
    }

    fn options(&self) -> &StatementOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_options() {
        let connection = MemoryConnection::connect(
            "memory://?server_prepare=false&max_prepared=3&reject_prepare=call,load&latency_ms=5"
                .into(),
        )
        .await
        .unwrap();
        assert!(!connection.options().server_prepare);
        assert!(connection.options().release_on_failover);
        let server = connection.server().await;
        assert_eq!(server.policy().max_prepared, Some(3));
        assert_eq!(server.policy().reject_keywords, ["call", "load"]);
        assert_eq!(server.latency(), Duration::from_millis(5));
    }

    #[tokio::test]
    async fn connect_errors() {
        assert!(MemoryConnection::connect("sqlite://x".into()).await.is_err());
        let error = MemoryConnection::connect("memory://?latency_ms=soon".into())
            .await
            .unwrap_err();
        assert!(format!("{error:#}").contains("latency_ms"), "{error:#}");
    }

    #[tokio::test]
    async fn cancel_before_request() {
        let connection = MemoryConnection::connect("memory://".into()).await.unwrap();
        let token = CancelToken::new();
        token.cancel();
        let error = connection
            .request(&token, None, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<StatementError>(),
            Some(StatementError::Interrupted)
        ));
        assert!(!token.is_cancelled());
        connection.request(&token, None, |_| Ok(())).await.unwrap();
    }

    #[tokio::test]
    async fn timeout_shorter_than_latency() {
        let connection = MemoryConnection::connect("memory://?latency_ms=200".into())
            .await
            .unwrap();
        let error = connection
            .request(
                &CancelToken::new(),
                Some(Duration::from_millis(10)),
                |_| Ok(()),
            )
            .await
            .unwrap_err();
        assert!(error.to_string().contains("interrupted"), "{error}");
    }
}
