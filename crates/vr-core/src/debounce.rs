//! Delay-coalescing timer for rapidly changing input

use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Holds back a value until it has been stable for a quiet period.
///
/// Each [`push`](Debouncer::push) restarts the quiet period; only the most
/// recent value is ever released.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.quiet));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Release the pending value if its quiet period has elapsed.
    pub fn poll(&mut self) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if Instant::now() >= *deadline => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// Wait out the quiet period and release the pending value.
    pub async fn settle(&mut self) -> Option<T> {
        let deadline = self.pending.as_ref()?.1;
        tokio::time::sleep_until(deadline).await;
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value without releasing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
