use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation request for the executions of one statement.
///
/// A request stays armed until an execution observes it with [`CancelToken::take`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(false)),
        }
    }
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
    /// Disarms the token, returning whether a request was pending.
    pub fn take(&self) -> bool {
        self.sender.send_replace(false)
    }
    /// Resolves once the token is armed.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|v| *v).await;
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;
    use std::time::Duration;

    #[test]
    fn take_disarms() {
        let token = CancelToken::new();
        assert!(!token.take());
        token.cancel();
        assert!(token.clone().is_cancelled());
        assert!(token.take());
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_up() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("The token was never cancelled");
    }
}
