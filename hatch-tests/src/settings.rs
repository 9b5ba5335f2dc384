use crate::setup;
use hatch::{
    Connection, ConnectionExt, FetchDirection, Holdability, Result, StatementError,
};
use std::{sync::LazyLock, time::Duration};
use tokio::sync::Mutex;

pub async fn settings<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    setup(
        connection,
        "settings",
        "CREATE TABLE settings (id INTEGER PRIMARY KEY)",
    )
    .await?;
    let mut insert = connection.prepare("INSERT INTO settings VALUES (?)").await?;
    for i in 1..=5 {
        insert.bind_index(i, 0)?;
        insert.add_batch()?;
    }
    insert.execute_batch().await?;
    insert.close().await?;

    let mut select = connection.prepare("SELECT * FROM settings").await?;
    assert!(select.to_string().contains("SELECT * FROM settings"));

    // Row limit
    assert_eq!(select.max_rows(), 0);
    select.set_max_rows(2);
    assert_eq!(select.max_rows(), 2);
    assert_eq!(select.execute_query().await?.len(), 2);
    select.set_max_rows(0);
    assert_eq!(select.execute_query().await?.len(), 5);

    // Plain settings
    select.set_fetch_size(10);
    assert_eq!(select.fetch_size(), 10);
    assert_eq!(select.fetch_direction(), FetchDirection::Forward);
    select.set_fetch_direction(FetchDirection::Reverse);
    assert_eq!(select.fetch_direction(), FetchDirection::Reverse);
    select.set_max_field_size(64);
    assert_eq!(select.max_field_size(), 64);
    select.set_query_timeout(Some(Duration::from_secs(30)));
    assert_eq!(select.query_timeout(), Some(Duration::from_secs(30)));
    select.set_escape_processing(false);
    select.set_cursor_name(Some("settings_cursor".into()));
    assert_eq!(select.holdability(), Holdability::CloseCursorsAtCommit);
    assert!(select.is_poolable());
    select.set_poolable(false);
    assert!(!select.is_poolable());
    assert!(!select.is_close_on_completion());
    select.close_on_completion();
    assert!(select.is_close_on_completion());
    assert!(select.warnings().is_empty());
    select.clear_warnings();

    // A query is not an update
    assert!(select.execute_update().await.is_err());
    assert_eq!(select.execute_query().await?.len(), 5);

    // Lifecycle
    assert!(!select.is_closed());
    select.close().await?;
    assert!(select.is_closed());
    let error = select.execute_query().await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<StatementError>(),
        Some(StatementError::Closed)
    ));
    select.close().await?;
    Ok(())
}
