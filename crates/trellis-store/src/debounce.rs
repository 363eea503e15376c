use std::time::{Duration, Instant};

/// Default quiet window between the last mutation and a durable write.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(150);

/// Write-debounce bookkeeping. Mutations mark the state dirty, the embedder
/// pumps `due`, and a successful flush clears the mark. Page-mutation bursts
/// then cost one write instead of one per event.
#[derive(Debug)]
pub struct SaveDebouncer {
    quiet_window: Duration,
    last_touch: Option<Instant>,
}

impl SaveDebouncer {
    pub fn new(quiet_window: Duration) -> Self {
        Self {
            quiet_window,
            last_touch: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.last_touch.is_some()
    }

    /// Record a mutation at `now`. Each touch restarts the quiet window.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }

    /// True once the state is dirty and the quiet window has elapsed.
    pub fn due(&self, now: Instant) -> bool {
        match self.last_touch {
            Some(touched) => now.duration_since(touched) >= self.quiet_window,
            None => false,
        }
    }

    /// Call after a successful flush.
    pub fn clear(&mut self) {
        self.last_touch = None;
    }
}

impl Default for SaveDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_state_is_never_due() {
        let d = SaveDebouncer::default();
        assert!(!d.is_dirty());
        assert!(!d.due(Instant::now()));
    }

    #[test]
    fn due_only_after_quiet_window() {
        let mut d = SaveDebouncer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        d.mark_dirty(t0);
        assert!(d.is_dirty());
        assert!(!d.due(t0 + Duration::from_millis(100)));
        assert!(d.due(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn each_touch_restarts_the_window() {
        let mut d = SaveDebouncer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        d.mark_dirty(t0);
        d.mark_dirty(t0 + Duration::from_millis(100));
        assert!(!d.due(t0 + Duration::from_millis(200)));
        assert!(d.due(t0 + Duration::from_millis(250)));
    }

    #[test]
    fn clear_resets_dirtiness() {
        let mut d = SaveDebouncer::new(Duration::from_millis(150));
        let t0 = Instant::now();
        d.mark_dirty(t0);
        d.clear();
        assert!(!d.due(t0 + Duration::from_secs(10)));
    }
}
