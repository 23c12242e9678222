//! Cooperative cancellation (spec §5): a `progress_token` threaded through
//! every async call. Realized with `tokio::sync::watch<bool>` rather than
//! pulling in `tokio-util` solely for `CancellationToken`, matching the
//! teacher's preference for `tokio::sync` primitives (spec §9 Design Note).

use tokio::sync::watch;

/// A cheap-to-clone handle that signals cooperative cancellation. Cloning
/// shares the same underlying flag; any clone can observe or trigger it.
#[derive(Clone)]
pub struct CancellationToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// The cooperative checkpoint every long-running task honours for
    /// pause/resume/cancellation (spec glossary: `progress_rendevouz`).
    /// Returns immediately if not cancelled; otherwise never resolves,
    /// relying on the caller to race it against its own work via
    /// `tokio::select!` so cancellation is observed at the next suspension
    /// point rather than busy-polled.
    pub async fn progress_rendevouz(&mut self) {
        if self.is_cancelled() {
            return;
        }
        // Waits for the flag to flip to `true`; a task that calls this and
        // loses a `select!` race against its own work simply never resolves
        // this branch, which is the desired "never silently abandoned"
        // behaviour paired with the caller's own suspension point.
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
