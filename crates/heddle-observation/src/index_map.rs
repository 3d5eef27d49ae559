#![forbid(unsafe_code)]

//! Index maps describing how collection positions changed in one mutation.
//!
//! An [`IndexMap`] is the payload of a collection change notification. It
//! has one entry per element of the *new* collection state: `Some(prior)`
//! when the element at that position came from index `prior` in the old
//! state (unchanged or moved), `None` when it was newly inserted. Prior
//! indices of removed elements are collected separately.
//!
//! A map can also represent a full reset, in which case subscribers should
//! re-read the collection instead of interpreting the entries as a delta.

/// Ordered description of one collection mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    entries: Vec<Option<usize>>,
    deleted: Vec<usize>,
    reset: bool,
}

impl IndexMap {
    /// An identity delta over `len` positions: entry `i` maps to prior
    /// index `i`, nothing deleted. The starting point for composing a
    /// mutation description.
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            entries: (0..len).map(Some).collect(),
            deleted: Vec::new(),
            reset: false,
        }
    }

    /// A full-reset map over `len` positions. Subscribers receiving a reset
    /// map should re-read the collection rather than replay a delta.
    #[must_use]
    pub fn reset(len: usize) -> Self {
        Self {
            entries: (0..len).map(Some).collect(),
            deleted: Vec::new(),
            reset: true,
        }
    }

    /// A delta with explicit entries, e.g. a permutation from a reorder.
    #[must_use]
    pub fn from_entries(entries: Vec<Option<usize>>) -> Self {
        Self {
            entries,
            deleted: Vec::new(),
            reset: false,
        }
    }

    /// Record an insertion at `index` of the new state. Entries at and
    /// after `index` shift right.
    ///
    /// # Panics
    ///
    /// Panics if `index > self.len()`.
    pub fn record_insert(&mut self, index: usize) {
        self.entries.insert(index, None);
    }

    /// Record a removal at `index` of the state the map currently
    /// describes. If the removed entry pointed at a prior index, that
    /// prior index is appended to the deleted list.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn record_remove(&mut self, index: usize) {
        if let Some(prior) = self.entries.remove(index) {
            self.deleted.push(prior);
        }
    }

    /// Number of entries (the length of the new collection state).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`: `Some(Some(prior))`, `Some(None)` for a fresh
    /// insertion, or `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Option<usize>> {
        self.entries.get(index).copied()
    }

    /// Iterate the entries in position order.
    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.entries.iter().copied()
    }

    /// Prior indices of removed elements, in removal order.
    #[must_use]
    pub fn deleted(&self) -> &[usize] {
        &self.deleted
    }

    /// Whether this map represents a full reset rather than a delta.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.reset
    }

    /// Whether the map describes any change at all: a reset, a deletion,
    /// an insertion, or a moved position.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.reset
            || !self.deleted.is_empty()
            || self
                .entries
                .iter()
                .enumerate()
                .any(|(i, entry)| *entry != Some(i))
    }
}
