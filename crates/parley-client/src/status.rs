// ABOUTME: Paced FIFO queue for status indicator updates
// ABOUTME: Enforces a minimum on-screen duration so rapid updates do not flicker

use crate::UiSurface;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Minimum wall-clock gap between two applied status updates.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1500);

struct StatusUpdate {
    id: String,
    text: String,
    queued_at: Instant,
}

/// Serializes status-text updates onto the UI surface.
///
/// Updates are applied in enqueue order, and consecutive applies are spaced
/// at least `min_interval` apart. The pacing is global to the queue, not
/// per indicator id: one request drives one queue, and spacing every change
/// keeps the sequence readable when the agent emits events back to back.
///
/// Enqueuing never blocks and never fails; this component only delays.
#[derive(Clone)]
pub struct StatusQueue {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusQueue {
    pub fn new(surface: Arc<dyn UiSurface>) -> Self {
        Self::with_interval(surface, DEFAULT_MIN_INTERVAL)
    }

    pub fn with_interval(surface: Arc<dyn UiSurface>, min_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drain(rx, surface, min_interval));
        Self { tx }
    }

    pub fn enqueue(&self, id: &str, text: &str) {
        let update = StatusUpdate {
            id: id.to_string(),
            text: text.to_string(),
            queued_at: Instant::now(),
        };
        if self.tx.send(update).is_err() {
            tracing::warn!("status drain task is gone, dropping update");
        }
    }
}

/// Drain loop: pops the oldest update, waits out the remainder of the pacing
/// interval, applies it, and repeats. Ends when every queue handle is dropped.
async fn drain(
    mut rx: mpsc::UnboundedReceiver<StatusUpdate>,
    surface: Arc<dyn UiSurface>,
    min_interval: Duration,
) {
    let mut last_applied: Option<Instant> = None;
    while let Some(update) = rx.recv().await {
        if let Some(last) = last_applied {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        surface.update_indicator(&update.id, &update.text);
        tracing::trace!(
            id = %update.id,
            queued_ms = update.queued_at.elapsed().as_millis() as u64,
            "status update applied"
        );
        last_applied = Some(Instant::now());
    }
}
