use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The latest detection result, published once per completed cycle.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub peak_hz_short: f32,
    pub peak_hz_long: f32,
    pub fire_short: bool,
    pub fire_long: bool,
    pub fire_overall: bool,
}

/// Single-slot handoff from the producer to any number of readers.
///
/// Publishing replaces the slot; reading copies it out without consuming.
/// The whole snapshot is written under the lock, so a reader never sees
/// fields from two different cycles.
#[derive(Clone, Default)]
pub struct MetricsChannel {
    slot: Arc<RwLock<Option<MetricsSnapshot>>>,
}

impl MetricsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: MetricsSnapshot) {
        // A poisoned lock still holds a whole snapshot: the value is Copy and
        // assigned in one statement.
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(snapshot);
    }

    pub fn peek_latest(&self) -> Option<MetricsSnapshot> {
        *self.slot.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Producer counters, written by the producer and read by anyone.
#[derive(Default)]
pub struct ProducerStats {
    cycles: AtomicU64,
    skipped_reads: AtomicU64,
    long_windows: AtomicU64,
    faults: AtomicU64,
    consecutive_faults: AtomicU64,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub skipped_reads: u64,
    pub long_windows: u64,
    pub faults: u64,
    pub consecutive_faults: u64,
}

impl ProducerStats {
    pub fn record_cycle(&self, long_window: bool) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if long_window {
            self.long_windows.fetch_add(1, Ordering::Relaxed);
        }
        self.consecutive_faults.store(0, Ordering::Relaxed);
    }

    /// Returns the running total of skipped reads.
    pub fn record_skipped_read(&self) -> u64 {
        self.skipped_reads.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the length of the current fault streak.
    pub fn record_fault(&self) -> u64 {
        self.faults.fetch_add(1, Ordering::Relaxed);
        self.consecutive_faults.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            skipped_reads: self.skipped_reads.load(Ordering::Relaxed),
            long_windows: self.long_windows.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            consecutive_faults: self.consecutive_faults.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn snapshot(hz: f32, fire: bool) -> MetricsSnapshot {
        MetricsSnapshot {
            peak_hz_short: hz,
            peak_hz_long: hz,
            fire_short: fire,
            fire_long: fire,
            fire_overall: fire,
        }
    }

    #[test]
    fn empty_before_first_publish() {
        assert_eq!(MetricsChannel::new().peek_latest(), None);
    }

    #[test]
    fn peek_does_not_consume() {
        let channel = MetricsChannel::new();
        channel.publish(snapshot(3100.0, true));
        assert_eq!(channel.peek_latest(), Some(snapshot(3100.0, true)));
        assert_eq!(channel.peek_latest(), Some(snapshot(3100.0, true)));
    }

    #[test]
    fn publish_overwrites() {
        let channel = MetricsChannel::new();
        let reader = channel.clone();
        channel.publish(snapshot(1.0, false));
        channel.publish(snapshot(2.0, true));
        assert_eq!(reader.peek_latest(), Some(snapshot(2.0, true)));
    }

    #[test]
    fn readers_never_see_mixed_cycles() {
        let channel = MetricsChannel::new();
        let writer = channel.clone();
        let handle = thread::spawn(move || {
            for i in 0..20_000 {
                writer.publish(snapshot(i as f32, i % 2 == 0));
            }
        });
        for _ in 0..20_000 {
            if let Some(s) = channel.peek_latest() {
                assert_eq!(s.peak_hz_short, s.peak_hz_long);
                assert_eq!(s.fire_short, (s.peak_hz_short as u32) % 2 == 0);
                assert_eq!(s.fire_short, s.fire_overall);
            }
        }
        handle.join().unwrap();
    }

    #[test]
    fn fault_streak_resets_on_success() {
        let stats = ProducerStats::default();
        assert_eq!(stats.record_fault(), 1);
        assert_eq!(stats.record_fault(), 2);
        stats.record_cycle(true);
        assert_eq!(stats.record_fault(), 1);
        let s = stats.snapshot();
        assert_eq!(s.faults, 3);
        assert_eq!(s.cycles, 1);
        assert_eq!(s.long_windows, 1);
    }
}
