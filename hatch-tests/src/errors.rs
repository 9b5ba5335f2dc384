use crate::{setup, silent_logs};
use hatch::{Connection, ConnectionExt, Result, StatementError, is_prepare_rejected};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn errors<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    setup(
        connection,
        "guarded",
        "CREATE TABLE guarded (id INTEGER PRIMARY KEY, label VARCHAR(20) NOT NULL)",
    )
    .await?;

    let mut insert = connection
        .prepare("INSERT INTO guarded VALUES (?, ?)")
        .await?;
    insert.bind(1)?.bind("one")?;
    assert_eq!(insert.execute_update().await?, 1);
    let server_assisted = insert.is_server_assisted();

    // Constraint failures come back as they are, the statement keeps its strategy
    let result;
    silent_logs! {
        result = insert.execute_update().await;
    }
    let error = result.unwrap_err();
    assert!(!is_prepare_rejected(&error));
    assert_eq!(insert.is_server_assisted(), server_assisted);

    // Unbound placeholders are detected before running
    insert.clear_parameters()?.bind(2)?;
    let result;
    silent_logs! {
        result = insert.execute_update().await;
    }
    let error = result.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<StatementError>(),
        Some(StatementError::MissingParameter(1))
    ));
    assert_eq!(insert.is_server_assisted(), server_assisted);

    // Binding past the placeholders
    assert!(insert.bind_index("three", 2).is_err());

    // Syntax errors do not switch strategy either
    let mut broken = connection.prepare("SELEC id FROM guarded").await?;
    let result;
    silent_logs! {
        result = broken.execute().await;
    }
    assert!(!is_prepare_rejected(&result.unwrap_err()));
    assert_eq!(broken.is_server_assisted(), server_assisted);

    insert.bind_index("two", 1)?;
    assert_eq!(insert.execute_update().await?, 1);
    Ok(())
}
