use crate::{Error, Result};
use std::str::FromStr;
use url::Url;

/// Connection level settings that shape how statements are prepared.
///
/// Read from the query string of the connection URL:
/// `memory://?server_prepare=false&release_on_failover=true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOptions {
    /// Start statements on the server prepare protocol. When false statements
    /// are client-side from the beginning.
    pub server_prepare: bool,
    /// Close the server statement abandoned by a failover.
    pub release_on_failover: bool,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            server_prepare: true,
            release_on_failover: true,
        }
    }
}

impl StatementOptions {
    pub const SERVER_PREPARE: &'static str = "server_prepare";
    pub const RELEASE_ON_FAILOVER: &'static str = "release_on_failover";

    /// Picks the keys it knows from `url`, other keys are left to the driver.
    pub fn from_url(url: &Url) -> Result<Self> {
        let mut result = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                Self::SERVER_PREPARE => result.server_prepare = parse_option(&key, &value)?,
                Self::RELEASE_ON_FAILOVER => {
                    result.release_on_failover = parse_option(&key, &value)?
                }
                _ => {}
            }
        }
        Ok(result)
    }
}

/// Parses the value of a connection URL option.
pub fn parse_option<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        Error::msg(format!(
            "Invalid value `{value}` for the connection option `{key}`"
        ))
    })
}
