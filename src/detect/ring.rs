/// Fixed-capacity circular buffer. Once full, each push overwrites the
/// oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    head: usize,
}

impl<T: Copy> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Returns the overwritten value, if any.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            return None;
        }
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            return None;
        }
        let old = std::mem::replace(&mut self.slots[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        Some(old)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Filled entries in storage order (not insertion order).
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Filled entries, oldest first.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }
}
