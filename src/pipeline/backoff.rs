use std::time::Duration;

/// Delay before the next poll: the fixed interval, stretched by any wait the
/// service asked for since the last poll.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    interval: Duration,
    pending_hint: Option<Duration>,
}

impl PollSchedule {
    pub fn new(interval: Duration) -> Self {
        Self { interval, pending_hint: None }
    }

    /// Remember a remote retry hint; the longest one wins.
    pub fn note_hint(&mut self, hint: Duration) {
        self.pending_hint = Some(self.pending_hint.map_or(hint, |h| h.max(hint)));
    }

    /// Consume the pending hint and return how long to sleep.
    pub fn next_delay(&mut self) -> Duration {
        match self.pending_hint.take() {
            Some(hint) => hint.max(self.interval),
            None => self.interval,
        }
    }
}
