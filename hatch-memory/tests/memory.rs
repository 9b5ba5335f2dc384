#[cfg(test)]
mod tests {
    use hatch_core::Driver;
    use hatch_memory::MemoryDriver;
    use hatch_tests::{execute_tests, init_logs};

    async fn run(url: &'static str) {
        init_logs();
        let driver = MemoryDriver::new();
        let connection = driver
            .connect(url.into())
            .await
            .expect("Could not open the database");
        execute_tests(connection).await;
    }

    #[tokio::test]
    async fn memory() {
        run("memory://").await;
    }

    #[tokio::test]
    async fn memory_client_side() {
        run("memory://?server_prepare=false").await;
    }

    #[tokio::test]
    async fn memory_rejecting_server() {
        run("memory://?reject_prepare=all").await;
    }

    #[tokio::test]
    async fn memory_slow_server() {
        run("memory://?latency_ms=1&reject_prepare=insert,delete").await;
    }
}
