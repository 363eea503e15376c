use std::time::Duration;
use trellis_core::TurnPair;

/// Seam to the host page. The embedder implements extraction plus the two
/// nudges the retry loop needs; tests drive a scripted fake.
pub trait PageHost {
    /// Ordered (user, assistant) pairs currently rendered. Synchronous and
    /// idempotent, but may undercount content the page has not finished
    /// rendering.
    fn extract_pairs(&mut self) -> Vec<TurnPair>;

    /// Force a reflow/scroll so lazily rendered content materializes.
    fn nudge(&mut self) {}

    /// Give the page one render tick before the next extraction attempt.
    fn settle(&mut self, _delay: Duration) {}
}

/// Bounded retry for pages that lag behind their own content. Exhaustion is
/// not a failure: the next external trigger starts a fresh attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            settle_delay: Duration::from_millis(60),
        }
    }
}
