/// A connection table keyed by descriptor.
///
/// Descriptors are dense small integers handed out by the kernel, so a
/// grow-only random-access sequence indexed by the descriptor itself is
/// the canonical representation; the sparsity this leaves behind is
/// tolerable for typical descriptor ranges.
///
/// The table grows when a new descriptor exceeds the current capacity
/// and never shrinks. A slot must be cleared before its descriptor
/// number can be reused by a later accept; [`remove`](Self::remove) in
/// the eviction path guarantees that.
pub(crate) struct ConnTable<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> ConnTable<T> {
    /// Creates a table with an initial capacity.
    pub(crate) fn new(capacity: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);

        Self { slots, live: 0 }
    }

    /// Stores a value under `index`, growing the table if needed.
    ///
    /// Growth is amortised: the table at least doubles so a burst of
    /// accepts does not reallocate per connection.
    pub(crate) fn insert(&mut self, index: usize, value: T) {
        if index >= self.slots.len() {
            let target = (index + 1).max(2 * self.slots.len());
            self.slots.resize_with(target, || None);
        }

        debug_assert!(self.slots[index].is_none(), "slot {index} already occupied");

        self.slots[index] = Some(value);
        self.live += 1;
    }

    /// Returns the value under `index`, if the slot is occupied.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(|slot| slot.as_mut())
    }

    /// Clears the slot under `index` and returns its value.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index).and_then(|slot| slot.take());

        if value.is_some() {
            self.live -= 1;
        }

        value
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_round_trip() {
        let mut table = ConnTable::new(4);

        table.insert(3, "a");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_mut(3), Some(&mut "a"));

        assert_eq!(table.remove(3), Some("a"));
        assert_eq!(table.len(), 0);
        assert_eq!(table.get_mut(3), None);
        assert_eq!(table.remove(3), None);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut table = ConnTable::new(2);

        table.insert(100, 1u8);
        assert_eq!(table.get_mut(100), Some(&mut 1u8));
        assert_eq!(table.get_mut(99), None);
    }

    #[test]
    fn slot_is_reusable_after_removal() {
        let mut table = ConnTable::new(2);

        table.insert(1, "first");
        assert_eq!(table.remove(1), Some("first"));

        table.insert(1, "second");
        assert_eq!(table.get_mut(1), Some(&mut "second"));
        assert_eq!(table.len(), 1);
    }
}
