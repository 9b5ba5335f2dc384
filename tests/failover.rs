#[cfg(test)]
mod tests {
    use hatch::{
        AsValue, Concurrency, Connection, ConnectionExt, Driver, PreparedStatement, Prepared,
        ResultSetMode, ResultSetType, Row, ServerPrepared, StatementError, StatementOptions,
        Strategy, Value, is_prepare_rejected,
    };
    use hatch_memory::{
        MemoryConnection, MemoryDriver, MemoryServerPrepared, PreparePolicy, Request,
    };
    use hatch_tests::{init_logs, silent_logs};
    use std::time::Duration;

    async fn connect(url: &'static str) -> MemoryConnection {
        init_logs();
        MemoryDriver::new()
            .connect(url.into())
            .await
            .expect("Could not open the database")
    }

    async fn run(connection: &MemoryConnection, sql: &str) {
        connection
            .prepare(sql)
            .await
            .expect("Failed to prepare the statement")
            .execute_update()
            .await
            .expect("Failed to run the statement");
    }

    async fn values(connection: &MemoryConnection) -> Vec<i64> {
        connection
            .prepare("SELECT v FROM t")
            .await
            .expect("Failed to prepare the select")
            .execute_query()
            .await
            .expect("Failed to run the select")
            .rows()
            .map(|row| i64::try_from_value(row.values()[0].clone()).expect("Not an integer"))
            .collect()
    }

    async fn history(connection: &MemoryConnection) -> Vec<Request> {
        let mut server = connection.server().await;
        let result = server.history().to_vec();
        server.clear_history();
        result
    }

    #[tokio::test]
    async fn server_assisted_insert() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        history(&connection).await;

        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        statement.bind_index(5, 0).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(statement.is_server_assisted());
        let history = history(&connection).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Request::Prepare("INSERT INTO t VALUES (?)".into()));
        assert!(matches!(
            &history[1],
            Request::Execute { parameters, .. } if **parameters == [Value::Int32(Some(5))]
        ));
        assert_eq!(values(&connection).await, [5]);
    }

    #[tokio::test]
    async fn rejected_prepare_fails_over_once() {
        let connection = connect("memory://?reject_prepare=insert").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        history(&connection).await;

        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        assert!(statement.is_server_assisted());
        statement.bind_index(5, 0).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(!statement.is_server_assisted());
        assert!(statement.client_prepared().is_some());
        assert_eq!(
            history(&connection).await,
            [
                Request::Prepare("INSERT INTO t VALUES (?)".into()),
                Request::Query("INSERT INTO t VALUES (5)".into()),
            ]
        );

        // Straight on the client strategy from now on
        statement.bind_index(7, 0).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(statement.execute().await.is_ok());
        assert_eq!(
            history(&connection).await,
            [
                Request::Query("INSERT INTO t VALUES (7)".into()),
                Request::Query("INSERT INTO t VALUES (7)".into()),
            ]
        );
        assert_eq!(values(&connection).await, [5, 7, 7]);
    }

    #[tokio::test]
    async fn batch_by_sql_is_unsupported() {
        let connection = connect("memory://?reject_prepare=insert").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        let unsupported = |statement: &mut PreparedStatement<MemoryDriver>| {
            let error = statement
                .add_batch_sql("INSERT INTO t VALUES (1)")
                .unwrap_err();
            assert!(matches!(
                error.downcast_ref::<StatementError>(),
                Some(StatementError::Unsupported(..))
            ));
        };
        unsupported(&mut statement);
        statement.bind(1).unwrap();
        statement.execute().await.unwrap();
        assert!(!statement.is_server_assisted());
        unsupported(&mut statement);
        assert_eq!(values(&connection).await, [1]);
    }

    #[tokio::test]
    async fn constraint_failure_passes_through() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER PRIMARY KEY)").await;
        run(&connection, "INSERT INTO t VALUES (1)").await;
        history(&connection).await;

        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        statement.bind(1).unwrap();
        let result;
        silent_logs! {
            result = statement.execute_query().await;
        }
        let error = result.unwrap_err();
        assert!(!is_prepare_rejected(&error));
        assert_eq!(
            error.root_cause().to_string(),
            "Duplicate entry '1' for key 'PRIMARY'"
        );
        assert!(statement.is_server_assisted());
        let history = history(&connection).await;
        assert_eq!(history.len(), 2);
        assert!(!history.iter().any(|v| matches!(v, Request::Query(..))));
    }

    #[tokio::test]
    async fn bindings_and_batch_migrate() {
        let connection = connect("memory://?reject_prepare=insert").await;
        run(&connection, "CREATE TABLE t (v INTEGER, w VARCHAR(10))").await;

        let mut statement = connection
            .prepare("INSERT INTO t (v, w) VALUES (?, ?)")
            .await
            .unwrap();
        for (v, w) in [(1, "one"), (2, "two"), (3, "it's")] {
            statement.bind_index(v, 0).unwrap().bind(w).unwrap();
            statement.add_batch().unwrap();
        }
        statement.set_max_rows(10);
        assert_eq!(statement.execute_batch().await.unwrap(), [1, 1, 1]);
        assert!(!statement.is_server_assisted());
        assert_eq!(statement.max_rows(), 10);
        assert_eq!(values(&connection).await, [1, 2, 3]);

        // The last bound values were carried over as well
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert_eq!(values(&connection).await, [1, 2, 3, 3]);
    }

    #[tokio::test]
    async fn invalidated_statement_fails_over() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;

        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        statement.bind(1).unwrap();
        statement.execute_update().await.unwrap();
        let handle = statement
            .server_prepared()
            .and_then(MemoryServerPrepared::handle)
            .expect("The statement must be prepared on the server");
        connection.server().await.invalidate_prepared();
        history(&connection).await;

        statement.bind_index(2, 0).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(!statement.is_server_assisted());
        assert_eq!(
            history(&connection).await,
            [
                Request::Execute {
                    handle,
                    parameters: Row::from([Value::Int32(Some(2))]),
                },
                Request::Close(handle),
                Request::Query("INSERT INTO t VALUES (2)".into()),
            ]
        );
        assert_eq!(connection.server().await.open_prepared(), 0);

        // A later invalidation does not concern the client strategy
        connection.server().await.invalidate_prepared();
        statement.bind_index(3, 0).unwrap();
        statement.execute_update().await.unwrap();
        assert_eq!(values(&connection).await, [1, 2, 3]);
    }

    #[tokio::test]
    async fn abandoned_statement_kept_on_request() {
        let connection = connect("memory://?release_on_failover=false").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let opened = connection.server().await.open_prepared();

        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        statement.bind(1).unwrap();
        statement.execute_update().await.unwrap();
        connection.server().await.invalidate_prepared();
        statement.execute_update().await.unwrap();
        assert!(!statement.is_server_assisted());
        let server = connection.server().await;
        assert_eq!(server.open_prepared(), opened + 1);
        assert!(!server.history().iter().any(|v| matches!(v, Request::Close(..))));
    }

    #[tokio::test]
    async fn metadata_fails_over() {
        let connection = connect("memory://?reject_prepare=select").await;
        run(&connection, "CREATE TABLE t (v INTEGER, w TEXT)").await;
        run(&connection, "INSERT INTO t VALUES (1, 'a')").await;

        let mut statement = connection
            .prepare("SELECT w FROM t WHERE v = ?")
            .await
            .unwrap();
        statement.bind(1).unwrap();
        let metadata = statement
            .metadata()
            .await
            .unwrap()
            .expect("Expected the description of the result set");
        assert_eq!(metadata.column_count(), 1);
        assert_eq!(metadata.column(0).unwrap().name, "w");
        assert!(!statement.is_server_assisted());

        // Still bound after the switch
        let rows = statement.execute_query().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows.rows().next().unwrap().get_column("w"),
            Some(&Value::Varchar(Some("a".into())))
        );
        assert_eq!(statement.parameter_metadata().await.unwrap().count(), 1);
    }

    #[tokio::test]
    async fn prepared_statement_limit() {
        let connection = connect("memory://?max_prepared=1").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        // The statement above holds the only slot
        let mut first = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        first.bind(1).unwrap();
        first.execute().await.unwrap();
        assert!(!first.is_server_assisted());
        first.close().await.unwrap();
        assert!(first.is_closed());
        assert_eq!(values(&connection).await, [1]);
    }

    #[tokio::test]
    async fn multiple_statements_run_as_text() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;

        let mut statement = connection
            .prepare("INSERT INTO t VALUES (?); INSERT INTO t VALUES (?)")
            .await
            .unwrap();
        statement.bind(4).unwrap().bind(5).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(!statement.is_server_assisted());
        assert_eq!(values(&connection).await, [4, 5]);
    }

    #[tokio::test]
    async fn client_side_from_the_start() {
        let connection = connect("memory://?server_prepare=false").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        assert!(!statement.is_server_assisted());
        statement.bind(9).unwrap();
        statement.execute_update().await.unwrap();
        assert_eq!(values(&connection).await, [9]);
        let history = history(&connection).await;
        assert!(!history.iter().any(|v| matches!(v, Request::Prepare(..))));
    }

    #[tokio::test]
    async fn forced_server_prepare() {
        let connection = connect("memory://?reject_prepare=delete").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        history(&connection).await;

        let server = MemoryServerPrepared::prepare(
            &connection,
            "SELECT * FROM t",
            ResultSetMode::default(),
            true,
        )
        .await
        .unwrap();
        assert!(server.handle().is_some());
        assert_eq!(
            history(&connection).await,
            [Request::Prepare("SELECT * FROM t".into())]
        );
        let mut statement =
            PreparedStatement::with_strategy(Strategy::<MemoryDriver>::ServerAssisted(server), *connection.options());
        assert!(statement.execute_query().await.unwrap().is_empty());
        assert!(statement.is_server_assisted());

        let result;
        silent_logs! {
            result = MemoryServerPrepared::prepare(
                &connection,
                "DELETE FROM t",
                ResultSetMode::default(),
                true,
            )
            .await;
        }
        assert!(is_prepare_rejected(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn pass_through_matches_the_active_strategy() {
        let connection = connect("memory://?reject_prepare=select").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let mut statement = connection.prepare("SELECT * FROM t").await.unwrap();
        let check = |statement: &PreparedStatement<MemoryDriver>| {
            let state = match statement.strategy() {
                Strategy::ServerAssisted(s) => s.state(),
                Strategy::ClientEmulated(s) => s.state(),
            };
            assert_eq!(statement.fetch_size(), state.fetch_size);
            assert_eq!(statement.max_rows(), state.max_rows);
            assert_eq!(statement.query_timeout(), state.query_timeout);
            assert_eq!(statement.is_poolable(), state.poolable);
            assert_eq!(statement.sql(), statement.strategy().sql());
            assert_eq!(statement.to_string(), statement.strategy().to_string());
        };
        statement.set_fetch_size(3);
        statement.set_max_rows(4);
        statement.set_poolable(false);
        check(&statement);
        statement.execute_query().await.unwrap();
        assert!(!statement.is_server_assisted());
        check(&statement);
        assert_eq!(statement.fetch_size(), 3);
        assert_eq!(statement.max_rows(), 4);
        assert!(!statement.is_poolable());
        assert_eq!(statement.connection().options(), &StatementOptions::default());
    }

    #[tokio::test]
    async fn batch_rejected_midway_is_not_retried() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let mut statement = connection.prepare("INSERT INTO t VALUES (?)").await.unwrap();
        statement.bind(0).unwrap();
        statement.execute_update().await.unwrap();
        for v in 1..=3 {
            statement.bind_index(v, 0).unwrap();
            statement.add_batch().unwrap();
        }

        connection
            .server()
            .await
            .set_latency(Duration::from_millis(60));
        let remote = connection.clone();
        let task = tokio::spawn(async move {
            // Queues on the server behind the first batch entry
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.server().await.invalidate_prepared();
        });
        let result;
        silent_logs! {
            result = statement.execute_batch().await;
        }
        task.await.unwrap();
        connection.server().await.set_latency(Duration::ZERO);

        let error = result.unwrap_err();
        assert!(!is_prepare_rejected(&error), "{error:#}");
        assert!(
            format!("{error:#}").contains("The batch stopped after"),
            "{error:#}"
        );
        assert!(statement.is_server_assisted());
        let rows = values(&connection).await;
        assert_eq!(rows[..2], [0, 1]);
        assert!(rows.len() < 4);
        assert!(rows.windows(2).all(|v| v[0] < v[1]), "{rows:?}");

        // The batch is gone, the lost handle is recovered on the next execution
        assert!(statement.execute_batch().await.unwrap().is_empty());
        statement.bind_index(9, 0).unwrap();
        assert_eq!(statement.execute_update().await.unwrap(), 1);
        assert!(!statement.is_server_assisted());
        assert_eq!(values(&connection).await.last(), Some(&9));
    }

    #[tokio::test]
    async fn policy_changed_while_connected() {
        let connection = connect("memory://").await;
        run(&connection, "CREATE TABLE t (v INTEGER)").await;
        let mode = ResultSetMode::new(ResultSetType::ScrollInsensitive, Concurrency::Updatable);

        let mut before = connection
            .prepare_with_mode("INSERT INTO t VALUES (?)", mode)
            .await
            .unwrap();
        before.bind(1).unwrap();
        before.execute_update().await.unwrap();
        connection
            .server()
            .await
            .set_policy(PreparePolicy::default().reject("insert"));
        assert_eq!(connection.server().await.policy().reject_keywords, ["insert"]);

        // Prepared before the change, still served by the server
        before.bind_index(2, 0).unwrap();
        before.execute_update().await.unwrap();
        assert!(before.is_server_assisted());

        let mut after = connection
            .prepare_with_mode("INSERT INTO t VALUES (?)", mode)
            .await
            .unwrap();
        after.bind(3).unwrap();
        after.execute_update().await.unwrap();
        assert!(!after.is_server_assisted());
        assert_eq!(after.mode(), mode);
        assert_eq!(before.mode(), mode);
        assert_eq!(values(&connection).await, [1, 2, 3]);
    }
}
