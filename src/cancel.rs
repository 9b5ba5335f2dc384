use hatch_core::CancelToken;
use parking_lot::Mutex;
use std::sync::Arc;

/// Token of the strategy currently active in a statement.
///
/// The failover swap replaces it under the same lock cancellation takes, so a
/// cancel always reaches the strategy that runs the call.
pub(crate) type CancelSlot = Arc<Mutex<CancelToken>>;

/// Cancels the execution in flight on a [`crate::PreparedStatement`] from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    pub(crate) slot: CancelSlot,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.slot.lock().cancel();
    }
}
