use crate::{column, setup};
use hatch::{AsValue, Connection, ConnectionExt, GeneratedKeys, Result};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn keys<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    setup(
        connection,
        "keyed",
        "CREATE TABLE keyed (id INTEGER PRIMARY KEY, label VARCHAR(20))",
    )
    .await?;

    let mut statement = connection.prepare("SELECT * FROM keyed").await?;

    // Ad-hoc SQL through the statement, with and without generated keys
    let inserted = statement
        .execute_update_sql_returning("INSERT INTO keyed VALUES (7, 'seven')", GeneratedKeys::Return)
        .await?;
    assert_eq!(inserted, 1);
    let keys = statement.generated_keys();
    assert_eq!(keys.len(), 1);
    let key = keys.rows().next().expect("Expected a generated key");
    assert_eq!(key.values().len(), 1);
    assert_eq!(i64::try_from_value(key.values()[0].clone())?, 7);
    statement
        .execute_update_sql("INSERT INTO keyed VALUES (8, 'eight')")
        .await?;
    assert!(statement.generated_keys().is_empty());

    // The prepared text itself
    assert!(statement.execute().await?);
    assert_eq!(statement.update_count(), None);
    let rows = statement.result_set().expect("Expected a result set");
    assert_eq!(rows.len(), 2);
    // Results are handed out once
    assert!(statement.result_set().is_none());

    let rows = statement
        .execute_query_sql("SELECT label FROM keyed WHERE id = 8")
        .await?;
    let row = rows.rows().next().expect("Expected the inserted row");
    assert_eq!(column::<String>(&row, "label")?, "eight");
    assert!(!statement.execute_sql("DELETE FROM keyed").await?);
    assert_eq!(statement.update_count(), Some(2));
    assert!(!statement.more_results());
    assert_eq!(statement.update_count(), None);
    Ok(())
}
