mod batch;
mod errors;
mod keys;
mod metadata;
mod settings;
mod simple;

use crate::{
    batch::batch, errors::errors, keys::keys, metadata::metadata, settings::settings,
    simple::simple,
};
use hatch::{AsValue, Connection, ConnectionExt, Error, Result, RowLabeled};
use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub async fn execute_tests<C: Connection>(connection: C) {
    simple(&connection)
        .await
        .expect("Simple test did not succeed");
    batch(&connection)
        .await
        .expect("Batch test did not succeed");
    metadata(&connection)
        .await
        .expect("Metadata test did not succeed");
    keys(&connection)
        .await
        .expect("Generated keys test did not succeed");
    settings(&connection)
        .await
        .expect("Settings test did not succeed");
    errors(&connection)
        .await
        .expect("Errors test did not succeed");
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}

/// Drops and recreates `table` with the given DDL.
pub(crate) async fn setup<C: Connection>(connection: &C, table: &str, ddl: &str) -> Result<()> {
    connection
        .prepare(&format!("DROP TABLE IF EXISTS {table}"))
        .await?
        .execute_update()
        .await?;
    connection.prepare(ddl).await?.execute_update().await?;
    Ok(())
}

/// Decodes the column `name` of `row`.
pub(crate) fn column<T: AsValue>(row: &RowLabeled, name: &str) -> Result<T> {
    let value = row
        .get_column(name)
        .cloned()
        .ok_or_else(|| Error::msg(format!("Column `{name}` is missing from the row")))?;
    T::try_from_value(value)
}
