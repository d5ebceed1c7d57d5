/// Whether the long window has a full set of samples waiting to be drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Filling,
    Ready,
}

/// Collects short blocks into one long analysis window.
///
/// Samples that arrive while the window is full and not yet drained are
/// dropped; they never spill into the next window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    buffer: Vec<f32>,
    index: usize,
    dropped: u64,
}

impl WindowAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            index: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[cfg(test)]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total samples discarded because the window was already full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, samples: &[f32]) -> WindowStatus {
        let room = self.buffer.len() - self.index;
        let take = samples.len().min(room);
        self.buffer[self.index..self.index + take].copy_from_slice(&samples[..take]);
        self.index += take;

        let excess = samples.len() - take;
        if excess > 0 {
            self.dropped += excess as u64;
            log::trace!("long window full, dropped {} samples", excess);
        }
        self.status()
    }

    pub fn status(&self) -> WindowStatus {
        if self.index == self.buffer.len() {
            WindowStatus::Ready
        } else {
            WindowStatus::Filling
        }
    }

    /// Hands the full window to `f` and starts a new one. Returns `None`
    /// without calling `f` while the window is still filling.
    pub fn drain<R>(&mut self, f: impl FnOnce(&[f32]) -> R) -> Option<R> {
        if self.status() != WindowStatus::Ready {
            return None;
        }
        let out = f(&self.buffer);
        self.index = 0;
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: usize = 4;
    const LONG: usize = 16;

    fn block(value: f32) -> Vec<f32> {
        vec![value; SHORT]
    }

    #[test]
    fn fills_after_long_over_short_blocks() {
        let mut acc = WindowAccumulator::new(LONG);
        let mut ready = 0;
        for i in 0..LONG / SHORT {
            if acc.push(&block(i as f32)) == WindowStatus::Ready {
                ready += 1;
            }
        }
        assert_eq!(ready, 1);

        let mut runs = 0;
        let first = acc.drain(|w| {
            runs += 1;
            w.to_vec()
        });
        assert_eq!(runs, 1);
        assert_eq!(first.unwrap()[..SHORT], [0.0; SHORT]);
        assert_eq!(acc.index(), 0);
        assert!(acc.drain(|_| ()).is_none());
    }

    #[test]
    fn extra_block_before_drain_is_dropped() {
        let mut acc = WindowAccumulator::new(LONG);
        for _ in 0..LONG / SHORT {
            acc.push(&block(1.0));
        }
        assert_eq!(acc.push(&block(9.0)), WindowStatus::Ready);
        assert_eq!(acc.index(), LONG);
        assert_eq!(acc.dropped(), SHORT as u64);

        let drained = acc.drain(|w| w.to_vec()).unwrap();
        assert!(drained.iter().all(|&s| s == 1.0));

        acc.push(&block(2.0));
        assert_eq!(acc.index(), SHORT);
        for _ in 1..LONG / SHORT {
            acc.push(&block(2.0));
        }
        let next = acc.drain(|w| w.to_vec()).unwrap();
        assert!(next.iter().all(|&s| s == 2.0));
    }

    #[test]
    fn partial_block_takes_only_remaining_room() {
        let mut acc = WindowAccumulator::new(10);
        acc.push(&[1.0; 8]);
        assert_eq!(acc.push(&[2.0; 4]), WindowStatus::Ready);
        assert_eq!(acc.dropped(), 2);
        assert_eq!(acc.index(), 10);
    }
}
