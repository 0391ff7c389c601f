use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debounce timer.
///
/// Each `feed` replaces the pending value and pushes the deadline out by the
/// full quiet period. The value becomes due only once input has been quiet for
/// that long. The timer never fires on its own: the owner waits for
/// [`Debouncer::deadline`] and then calls [`Debouncer::take_due`].
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    pub fn feed(&mut self, value: T) {
        self.feed_at(value, Instant::now());
    }

    pub fn feed_at(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending { value, deadline: now + self.delay });
    }

    /// Drops the pending value, returning it if there was one.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Takes the pending value if its quiet period has elapsed at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if p.deadline <= now => self.cancel(),
            _ => None,
        }
    }

    /// Takes the pending value without waiting for the quiet period.
    pub fn flush(&mut self) -> Option<T> {
        self.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(1200);

    #[test]
    fn value_is_due_only_after_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);

        d.feed_at("NYC", start);
        assert_eq!(d.take_due(start + Duration::from_millis(1199)), None);
        assert_eq!(d.take_due(start + DELAY), Some("NYC"));
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn each_feed_resets_the_deadline_and_keeps_latest_value() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);

        d.feed_at("N", start);
        d.feed_at("NY", start + Duration::from_millis(1000));
        d.feed_at("NYC", start + Duration::from_millis(2000));

        assert_eq!(d.take_due(start + Duration::from_millis(2500)), None);
        assert_eq!(d.deadline(), Some(start + Duration::from_millis(3200)));
        assert_eq!(d.take_due(start + Duration::from_millis(3200)), Some("NYC"));
        assert_eq!(d.take_due(start + Duration::from_millis(9000)), None);
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut d = Debouncer::new(DELAY);

        d.feed_at("Par", start);
        assert_eq!(d.cancel(), Some("Par"));
        assert_eq!(d.deadline(), None);
        assert_eq!(d.take_due(start + DELAY * 2), None);
    }

    #[test]
    fn flush_ignores_deadline() {
        let mut d = Debouncer::new(DELAY);
        d.feed("Tok");
        assert_eq!(d.flush(), Some("Tok"));
        assert_eq!(d.flush(), None);
    }
}
