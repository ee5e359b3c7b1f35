//! Ordered double-ended list with a persistent cycling cursor.

use std::collections::VecDeque;

/// Double-ended sequence with predicate-based removal and a wrap-around
/// read cursor.
///
/// The cursor stays on the same logical element when items are inserted or
/// removed in front of it.
///
/// ```
/// use prometheus_taskpool::core::List;
///
/// let mut list = List::new();
/// list.push_back(1);
/// list.push_back(2);
/// assert_eq!(list.cycling_next(), Some(&1));
/// assert_eq!(list.cycling_next(), Some(&2));
/// assert_eq!(list.cycling_next(), Some(&1));
/// ```
#[derive(Debug, Clone)]
pub struct List<T> {
    items: VecDeque<T>,
    cursor: usize,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> List<T> {
    /// Empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
            cursor: 0,
        }
    }

    /// Empty list with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the list holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert at the front.
    pub fn push_front(&mut self, item: T) {
        if !self.items.is_empty() {
            self.cursor += 1;
        }
        self.items.push_front(item);
    }

    /// Insert at the back.
    pub fn push_back(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove and return the front item.
    pub fn pop_front(&mut self) -> Option<T> {
        self.remove_at(0)
    }

    /// Remove and return the back item.
    pub fn pop_back(&mut self) -> Option<T> {
        let last = self.items.len().checked_sub(1)?;
        self.remove_at(last)
    }

    /// Remove and return the first item (from the front) matching `pred`.
    pub fn pop_if<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let pos = self.items.iter().position(|item| pred(item))?;
        self.remove_at(pos)
    }

    /// First item (from the front) matching `pred`.
    pub fn find<F>(&self, mut pred: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().find(|item| pred(item))
    }

    /// Front item.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Back item.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Item under the cursor, advancing the cursor and wrapping at the end.
    pub fn cycling_next(&mut self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
        let at = self.cursor;
        self.cursor = (at + 1) % self.items.len();
        self.items.get(at)
    }

    /// Iterate front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Drop every item.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.items.clear();
    }

    /// Remove every item, front to back.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.cursor = 0;
        self.items.drain(..)
    }

    fn remove_at(&mut self, pos: usize) -> Option<T> {
        let item = self.items.remove(pos)?;
        if pos < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.items.len() {
            self.cursor = 0;
        }
        Some(item)
    }
}
