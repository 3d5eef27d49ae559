#![forbid(unsafe_code)]

//! Observable array: index-map-producing mutators over a `Vec`.
//!
//! [`ArrayObserver`] owns the collection it observes. Every mutator
//! computes an [`IndexMap`] describing the shape change, applies the
//! mutation, and fans the map out to collection subscribers; a lazily
//! created [`CollectionLengthObserver`] additionally reports the length as
//! an ordinary scalar observable whenever it changed.
//!
//! Mutations that leave the collection shape untouched (an empty splice, a
//! reverse of one element) notify nobody.

use std::cell::{Cell, OnceCell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use tracing::trace;

use crate::flags::ChangeFlags;
use crate::index_map::IndexMap;
use crate::record::{CollectionSubscriberRecord, SubscriberRecord};
use crate::subscriber::{
    CollectionSubscribable, CollectionSubscriber, Subscribable, Subscriber,
};

/// Scalar observer of a collection's length, owned by an
/// [`ArrayObserver`] and fed after each mutation that changed the length.
pub struct CollectionLengthObserver {
    len: Cell<usize>,
    subs: OnceCell<SubscriberRecord<usize>>,
}

impl CollectionLengthObserver {
    fn new(len: usize) -> Self {
        Self {
            len: Cell::new(len),
            subs: OnceCell::new(),
        }
    }

    /// The length as of the last mutation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    fn set_len(&self, new_len: usize, flags: ChangeFlags) {
        let old_len = self.len.replace(new_len);
        if old_len != new_len
            && let Some(subs) = self.subs.get()
        {
            subs.notify(&new_len, &old_len, flags);
        }
    }
}

impl Subscribable<usize> for CollectionLengthObserver {
    fn subscribe(&self, subscriber: Rc<dyn Subscriber<usize>>) -> bool {
        self.subs.get_or_init(SubscriberRecord::new).add(subscriber)
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber<usize>>) -> bool {
        match self.subs.get() {
            Some(subs) => subs.remove(subscriber),
            None => false,
        }
    }
}

/// Observes a `Vec<T>`, describing each mutation with an [`IndexMap`].
pub struct ArrayObserver<T> {
    items: RefCell<Vec<T>>,
    subs: OnceCell<CollectionSubscriberRecord>,
    len_observer: OnceCell<Rc<CollectionLengthObserver>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for ArrayObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayObserver")
            .field("items", &self.items.borrow())
            .field(
                "subscriber_count",
                &self.subs.get().map_or(0, CollectionSubscriberRecord::count),
            )
            .finish()
    }
}

impl<T: Clone> ArrayObserver<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items),
            subs: OnceCell::new(),
            len_observer: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Clone out the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    /// Read the collection by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.borrow())
    }

    /// Clone out the whole collection.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    /// Lazily-created observer over this collection's length.
    #[must_use]
    pub fn length_observer(&self) -> Rc<CollectionLengthObserver> {
        Rc::clone(self.len_observer.get_or_init(|| {
            Rc::new(CollectionLengthObserver::new(self.items.borrow().len()))
        }))
    }

    /// Append `item` to the end.
    pub fn push(&self, item: T, flags: ChangeFlags) {
        let map = {
            let mut items = self.items.borrow_mut();
            let mut map = IndexMap::identity(items.len());
            items.push(item);
            map.record_insert(map.len());
            map
        };
        self.notify(&map, flags);
    }

    /// Remove and return the last element.
    pub fn pop(&self, flags: ChangeFlags) -> Option<T> {
        let (item, map) = {
            let mut items = self.items.borrow_mut();
            let item = items.pop()?;
            let mut map = IndexMap::identity(items.len() + 1);
            map.record_remove(items.len());
            (item, map)
        };
        self.notify(&map, flags);
        Some(item)
    }

    /// Remove and return the first element.
    pub fn shift(&self, flags: ChangeFlags) -> Option<T> {
        self.remove(0, flags)
    }

    /// Prepend `item`.
    pub fn unshift(&self, item: T, flags: ChangeFlags) {
        self.insert(0, item, flags);
    }

    /// Insert `item` at `index`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `index > self.len()`.
    pub fn insert(&self, index: usize, item: T, flags: ChangeFlags) {
        let map = {
            let mut items = self.items.borrow_mut();
            let mut map = IndexMap::identity(items.len());
            items.insert(index, item);
            map.record_insert(index);
            map
        };
        self.notify(&map, flags);
    }

    /// Remove and return the element at `index`, or `None` past the end.
    pub fn remove(&self, index: usize, flags: ChangeFlags) -> Option<T> {
        let (item, map) = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            let mut map = IndexMap::identity(items.len());
            let item = items.remove(index);
            map.record_remove(index);
            (item, map)
        };
        self.notify(&map, flags);
        Some(item)
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `items` in their place, returning the removed elements. Out-of-range
    /// `start` and `delete_count` are clamped.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        new_items: Vec<T>,
        flags: ChangeFlags,
    ) -> Vec<T> {
        let (removed, map) = {
            let mut items = self.items.borrow_mut();
            let start = start.min(items.len());
            let delete_count = delete_count.min(items.len() - start);
            let mut map = IndexMap::identity(items.len());
            for _ in 0..delete_count {
                map.record_remove(start);
            }
            for offset in 0..new_items.len() {
                map.record_insert(start + offset);
            }
            let removed: Vec<T> = items
                .splice(start..start + delete_count, new_items)
                .collect();
            (removed, map)
        };
        self.notify(&map, flags);
        removed
    }

    /// Reverse the collection in place.
    pub fn reverse(&self, flags: ChangeFlags) {
        let map = {
            let mut items = self.items.borrow_mut();
            let len = items.len();
            items.reverse();
            IndexMap::from_entries((0..len).rev().map(Some).collect())
        };
        self.notify(&map, flags);
    }

    /// Sort the collection by `compare` (stable), reporting where each
    /// element came from.
    pub fn sort_by<F>(&self, mut compare: F, flags: ChangeFlags)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let map = {
            let mut items = self.items.borrow_mut();
            let mut order: Vec<usize> = (0..items.len()).collect();
            order.sort_by(|&a, &b| compare(&items[a], &items[b]));
            let sorted: Vec<T> = order.iter().map(|&i| items[i].clone()).collect();
            *items = sorted;
            IndexMap::from_entries(order.into_iter().map(Some).collect())
        };
        self.notify(&map, flags);
    }

    /// Replace the whole collection, returning the previous contents.
    /// Subscribers receive a full-reset map.
    pub fn replace(&self, new_items: Vec<T>, flags: ChangeFlags) -> Vec<T> {
        trace!(len = new_items.len(), "collection reset");
        let (old_items, map) = {
            let mut items = self.items.borrow_mut();
            let map = IndexMap::reset(new_items.len());
            (std::mem::replace(&mut *items, new_items), map)
        };
        self.notify(&map, flags);
        old_items
    }

    fn notify(&self, map: &IndexMap, flags: ChangeFlags) {
        if !map.has_changes() {
            return;
        }
        if let Some(subs) = self.subs.get() {
            subs.notify_collection(map, flags);
        }
        if let Some(len_observer) = self.len_observer.get() {
            len_observer.set_len(self.items.borrow().len(), flags);
        }
    }
}

impl<T: Clone> CollectionSubscribable for ArrayObserver<T> {
    fn subscribe(&self, subscriber: Rc<dyn CollectionSubscriber>) -> bool {
        self.subs
            .get_or_init(CollectionSubscriberRecord::new)
            .add(subscriber)
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn CollectionSubscriber>) -> bool {
        match self.subs.get() {
            Some(subs) => subs.remove(subscriber),
            None => false,
        }
    }
}
