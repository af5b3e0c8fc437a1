//! Minimum spacing between remote NationStates calls.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum gap between consecutive remote calls.
///
/// Call [`ready`](Self::ready) before a request and [`mark`](Self::mark) once
/// it completes. The gap is measured from the end of one call to the start of
/// the next.
#[derive(Debug)]
pub struct RequestPacer {
    min_gap: Duration,
    last: Option<Instant>,
}

impl RequestPacer {
    /// Create a pacer with the given minimum gap.
    #[must_use]
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last: None,
        }
    }

    /// Configured minimum gap.
    #[must_use]
    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Wait until the next remote call is allowed.
    pub async fn ready(&self) {
        let Some(last) = self.last else {
            return;
        };
        let next = last + self.min_gap;
        let now = Instant::now();
        if next > now {
            debug!("Pacing: waiting {:?} before next request", next - now);
            tokio::time::sleep_until(next).await;
        }
    }

    /// Record that a remote call just finished.
    pub fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}
