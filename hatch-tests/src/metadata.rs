use crate::setup;
use hatch::{Connection, ConnectionExt, Result};
use std::sync::LazyLock;
use tokio::sync::Mutex;

pub async fn metadata<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    setup(
        connection,
        "described",
        "CREATE TABLE described (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL, note TEXT)",
    )
    .await?;

    let mut select = connection
        .prepare("SELECT id, name FROM described WHERE note = ?")
        .await?;
    let metadata = select
        .metadata()
        .await?
        .expect("A query must describe its result set");
    assert_eq!(metadata.column_count(), 2);
    let id = metadata.column(0).expect("Missing the id column");
    assert!(id.name.eq_ignore_ascii_case("id"));
    assert!(!id.nullable);
    let name = metadata.column(1).expect("Missing the name column");
    assert!(name.name.eq_ignore_ascii_case("name"));
    assert!(!name.nullable);
    assert_eq!(select.parameter_metadata().await?.count(), 1);

    // Describing does not need the parameters and does not run the query
    select.bind("anything")?;
    assert!(select.execute_query().await?.is_empty());

    let mut delete = connection
        .prepare("DELETE FROM described WHERE id = ?")
        .await?;
    assert!(delete.metadata().await?.is_none());
    assert_eq!(delete.parameter_metadata().await?.count(), 1);
    Ok(())
}
