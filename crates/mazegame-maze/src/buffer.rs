//! An unordered buffer with O(1) removal of a random element.

use rand::Rng;

/// Elements come out in random order. Removal swaps the chosen slot with the
/// last one, so insertion order is not preserved.
#[derive(Debug, Clone)]
pub struct RandomBuffer<T> {
    items: Vec<T>,
}

impl<T> Default for RandomBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RandomBuffer<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes and returns a uniformly chosen element.
    pub fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.items.len());
        Some(self.items.swap_remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Extend<T> for RandomBuffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}
