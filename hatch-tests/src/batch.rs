use crate::{column, setup};
use hatch::{Connection, ConnectionExt, Result, StatementError};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn batch<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    setup(
        connection,
        "batch_items",
        "CREATE TABLE batch_items (id INTEGER PRIMARY KEY, label VARCHAR(20))",
    )
    .await?;

    let mut insert = connection
        .prepare("INSERT INTO batch_items VALUES (?, ?)")
        .await?;
    for i in 1..=3 {
        insert.bind(i)?.bind(format!("item {i}"))?;
        insert.add_batch()?;
    }
    assert_eq!(insert.execute_batch().await?, [1, 1, 1]);
    // The batch is consumed by its execution
    assert!(insert.execute_batch().await?.is_empty());

    // Cleared batch
    insert.bind(4)?.bind("dropped")?;
    insert.add_batch()?;
    insert.clear_batch();
    assert!(insert.execute_batch().await?.is_empty());

    // Every placeholder must be bound to queue an entry
    insert.clear_parameters()?.bind(5)?;
    let error = insert.add_batch().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<StatementError>(),
        Some(StatementError::MissingParameter(1))
    ));

    // Batches by SQL text are never accepted
    let error = insert
        .add_batch_sql("INSERT INTO batch_items VALUES (9, 'nine')")
        .unwrap_err();
    assert!(matches!(
        error.downcast_ref::<StatementError>(),
        Some(StatementError::Unsupported(..))
    ));

    let mut count = connection
        .prepare("SELECT COUNT(*) FROM batch_items")
        .await?;
    let rows = count.execute_query().await?;
    let row = rows.rows().next().expect("Expected a count");
    assert_eq!(column::<i64>(&row, "COUNT(*)")?, 3);
    Ok(())
}
