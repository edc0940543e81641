use std::time::{Duration, Instant};

/// Coalesces bursts of restart requests (debounce) and keeps consecutive
/// restarts at least `min_interval` apart (throttle).
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    min_interval: Duration,
    deadline: Option<Instant>,
    last_fire: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration, min_interval: Duration) -> Self {
        Self { delay, min_interval, deadline: None, last_fire: None }
    }

    /// Arms (or pushes out) the deadline.
    pub fn request(&mut self, now: Instant) {
        let mut at = now + self.delay;
        if let Some(last) = self.last_fire {
            let earliest = last + self.min_interval;
            if at < earliest { at = earliest; }
        }
        self.deadline = Some(at);
    }

    pub fn cancel(&mut self) { self.deadline = None; }

    pub fn is_pending(&self) -> bool { self.deadline.is_some() }

    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// True exactly once per armed deadline, once `now` has reached it.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|at| at.saturating_duration_since(now))
    }
}
