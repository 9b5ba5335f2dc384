use crate::{column, setup};
use hatch::{Connection, ConnectionExt, Result, Value};
use indoc::indoc;
use rust_decimal::Decimal;
use std::sync::LazyLock;
use time::macros::{date, datetime};
use tokio::sync::Mutex;

pub async fn simple<C: Connection>(connection: &C) -> Result<()> {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    setup(
        connection,
        "simple_fields",
        indoc! {"
            CREATE TABLE simple_fields (
                id INTEGER PRIMARY KEY,
                name VARCHAR(40),
                ratio DOUBLE,
                flag BOOLEAN,
                payload BLOB
            )
        "},
    )
    .await?;

    // Insert
    let mut insert = connection
        .prepare("INSERT INTO simple_fields (id, name, ratio, flag, payload) VALUES (?, ?, ?, ?, ?)")
        .await?;
    insert
        .bind(1)?
        .bind("Hello 'world'!\n")?
        .bind(0.25)?
        .bind(true)?
        .bind(vec![0xCA_u8, 0xFE])?;
    assert_eq!(insert.execute_update().await?, 1);
    insert
        .clear_parameters()?
        .bind(2)?
        .bind_null(1, &Value::Varchar(None))?
        .bind(-1.5e-3)?
        .bind(false)?
        .bind_stream(4, &b"streamed bytes"[..], Some(8))?;
    assert!(!insert.execute().await?);
    assert_eq!(insert.update_count(), Some(1));
    assert!(insert.result_set().is_none());

    // Select
    let mut select = connection
        .prepare("SELECT name, ratio, flag, payload FROM simple_fields WHERE id = ?")
        .await?;
    select.bind(1)?;
    let rows = select.execute_query().await?;
    assert_eq!(rows.len(), 1);
    let row = rows.rows().next().expect("Expected the first row");
    assert_eq!(column::<String>(&row, "name")?, "Hello 'world'!\n");
    assert_eq!(column::<f64>(&row, "ratio")?, 0.25);
    assert!(column::<bool>(&row, "flag")?);
    assert_eq!(column::<Vec<u8>>(&row, "payload")?, [0xCA, 0xFE]);

    // Same statement, new parameter
    select.bind_index(2, 0)?;
    let rows = select.execute_query().await?;
    let row = rows.rows().next().expect("Expected the second row");
    assert_eq!(column::<Option<String>>(&row, "name")?, None);
    assert_eq!(column::<f64>(&row, "ratio")?, -1.5e-3);
    assert!(!column::<bool>(&row, "flag")?);
    assert_eq!(column::<Vec<u8>>(&row, "payload")?, b"streamed");

    select.bind_index(99, 0)?;
    assert!(select.execute_query().await?.is_empty());

    // Placeholder-looking text is not a parameter
    let mut quoted = connection
        .prepare("SELECT id FROM simple_fields WHERE name = '?'")
        .await?;
    assert!(quoted.execute_query().await?.is_empty());
    assert_eq!(quoted.parameter_metadata().await?.count(), 0);

    // Values found back through a parameter compare equal to the stored ones
    setup(
        connection,
        "typed_fields",
        "CREATE TABLE typed_fields (id INTEGER PRIMARY KEY, price DECIMAL(8, 2), day DATE, at TIMESTAMP)",
    )
    .await?;
    let mut insert = connection
        .prepare("INSERT INTO typed_fields VALUES (?, ?, ?, ?)")
        .await?;
    insert
        .bind(1_u8)?
        .bind(Decimal::new(1250, 2))?
        .bind(date!(2024 - 02 - 29))?
        .bind(datetime!(2024-03-01 10:30:00.5))?;
    insert.execute_update().await?;
    for (filter, value) in [
        ("price", Value::Decimal(Some(Decimal::new(1250, 2)), 8, 2)),
        ("day", Value::Date(Some(date!(2024 - 02 - 29)))),
        ("at", Value::Timestamp(Some(datetime!(2024-03-01 10:30:00.5)))),
    ] {
        let mut select = connection
            .prepare(&format!("SELECT id FROM typed_fields WHERE {filter} = ?"))
            .await?;
        select.bind(value)?;
        let rows = select.execute_query().await?;
        let row = rows.rows().next().expect("Expected the typed row");
        assert_eq!(column::<u8>(&row, "id")?, 1);
    }
    Ok(())
}
