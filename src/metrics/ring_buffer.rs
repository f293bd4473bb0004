use crate::error::{ObservatoryError, Result};

/// Fixed-capacity ring buffer with O(1) push.
///
/// Slots are allocated as the buffer fills, so idle endpoints stay cheap.
/// Once full, every push overwrites the oldest surviving entry. `head`
/// always points at the next write slot, which is also the oldest entry
/// after the buffer has wrapped.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    head: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(ObservatoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            slots: Vec::new(),
            capacity,
            head: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Write at `head` and advance it. Never grows past capacity.
    pub fn push(&mut self, item: T) {
        if self.is_full() {
            self.slots[self.head] = item;
        } else {
            self.slots.push(item);
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// Valid entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.is_full() { self.head } else { 0 };
        let (newer, older) = self.slots.split_at(start);
        older.iter().chain(newer.iter())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Owned copy of the valid entries in insertion order (oldest first).
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
