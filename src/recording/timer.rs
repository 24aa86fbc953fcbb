use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Repeating tick source owned by exactly one recording attempt
///
/// Every tick carries the timer's generation. Dropping the timer aborts the
/// task; ticks already queued keep their old generation and are ignored by
/// the owner.
pub(crate) struct TickTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl TickTimer {
    /// First tick fires one `period` after spawning
    pub(crate) fn spawn(generation: u64, period: Duration, tx: mpsc::UnboundedSender<u64>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if tx.send(generation).is_err() {
                    break;
                }
            }
        });

        Self { generation, handle }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
