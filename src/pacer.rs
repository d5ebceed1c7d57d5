use std::thread;
use std::time::{Duration, Instant};

/// Spaces cycle starts at least `period` apart. A cycle that overruns
/// pushes the next one back; missed periods are never made up.
pub struct Pacer {
    period: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_start: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Earliest moment the next cycle may begin, given the current time.
    pub fn next_start(&self, now: Instant) -> Instant {
        match self.last_start {
            Some(last) => (last + self.period).max(now),
            None => now,
        }
    }

    /// Sleeps until the next cycle is due and records its start.
    pub fn wait(&mut self) -> Instant {
        let now = Instant::now();
        let due = self.next_start(now);
        if due > now {
            thread::sleep(due - now);
        }
        let start = Instant::now();
        self.last_start = Some(start);
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(45);

    #[test]
    fn first_cycle_starts_immediately() {
        let pacer = Pacer::new(PERIOD);
        let now = Instant::now();
        assert_eq!(pacer.next_start(now), now);
    }

    #[test]
    fn waits_out_the_rest_of_the_period() {
        let t0 = Instant::now();
        let pacer = Pacer {
            period: PERIOD,
            last_start: Some(t0),
        };
        assert_eq!(pacer.next_start(t0 + Duration::from_millis(10)), t0 + PERIOD);
    }

    #[test]
    fn overrun_starts_late_without_catching_up() {
        let t0 = Instant::now();
        let pacer = Pacer {
            period: PERIOD,
            last_start: Some(t0),
        };
        let late = t0 + Duration::from_millis(130);
        assert_eq!(pacer.next_start(late), late);
    }

    #[test]
    fn consecutive_waits_are_a_period_apart() {
        let mut pacer = Pacer::new(Duration::from_millis(5));
        let a = pacer.wait();
        let b = pacer.wait();
        assert!(b.duration_since(a) >= Duration::from_millis(5));
    }
}
