//! Binary max-heap ordered by a caller-supplied comparator.
//!
//! [`std::collections::BinaryHeap`] orders elements through their `Ord`
//! implementation. The merge loop needs an ordering that depends on a score
//! and a position, and other callers may want different orderings for the same
//! element type, so this heap takes the comparison as a closure instead.

use std::cmp::Ordering;
use std::fmt;

/// A max-heap whose priority is defined by `cmp`.
///
/// `cmp(a, b) == Ordering::Greater` means `a` has strictly higher priority
/// than `b`; [`pop_max`](Self::pop_max) always returns an element no other
/// element is greater than. The comparator must be a total preorder.
pub struct PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    items: Vec<T>,
    cmp: F,
}

impl<T, F> PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    pub fn new(cmp: F) -> Self {
        Self {
            items: Vec::new(),
            cmp,
        }
    }

    pub fn with_capacity(capacity: usize, cmp: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            cmp,
        }
    }

    /// Insert an element. O(log n).
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the highest-priority element. O(log n).
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Callers must check [`len`](Self::len)
    /// first; popping an empty queue is a logic error.
    pub fn pop_max(&mut self) -> T {
        assert!(!self.items.is_empty(), "pop_max called on an empty queue");

        let max = self.items.swap_remove(0);
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        max
    }

    /// The highest-priority element, if any.
    pub fn peek_max(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    fn higher(&self, a: usize, b: usize) -> bool {
        (self.cmp)(&self.items[a], &self.items[b]) == Ordering::Greater
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.higher(pos, parent) {
                break;
            }
            self.items.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.higher(right, left) {
                right
            } else {
                left
            };
            if !self.higher(child, pos) {
                break;
            }
            self.items.swap(pos, child);
            pos = child;
        }
    }
}

impl<T: fmt::Debug, F> fmt::Debug for PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("items", &self.items)
            .finish()
    }
}
