#![forbid(unsafe_code)]

//! Per-observable subscriber storage and change fan-out.
//!
//! [`SubscriberRecord`] (scalar protocol) and [`CollectionSubscriberRecord`]
//! (collection protocol) store up to three subscribers in dedicated fast
//! slots and spill the rest into an overflow vector, so the common
//! one-to-three-binding case never allocates. Scalar fan-out batches
//! deliveries through a re-entrancy-safe pending queue; collection fan-out
//! is a plain snapshot-and-call loop.
//!
//! # Invariants
//!
//! 1. A subscriber occupies at most one slot (fast or overflow).
//! 2. `count` equals the number of occupied slots.
//! 3. `any()` depends only on the occupancy bitmask, never on `count`.
//! 4. Handlers run with no interior borrow held, so they may freely
//!    subscribe, unsubscribe, and notify re-entrantly.
//! 5. Within one flush a subscriber is delivered at most once per queued
//!    change; a nested notify replaces a still-pending entry in place
//!    (last write wins).
//!
//! # Failure Modes
//!
//! - **Runaway recursion**: a handler that unconditionally re-notifies the
//!   same record panics once the nesting depth exceeds
//!   [`MAX_NOTIFY_DEPTH`]. That is a cycle in the subscriber graph, a bug
//!   in the caller, not a recoverable condition.
//! - **Panicking subscriber**: panics from handlers propagate; queue
//!   entries past the failure point are not delivered in that flush.
//!   Delivery is an at-most-once attempt per flush with no
//!   transactionality across subscribers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::flags::ChangeFlags;
use crate::index_map::IndexMap;
use crate::subscriber::{CollectionSubscriber, Subscriber};

/// Nesting depth past which scalar fan-out declares the subscriber graph
/// cyclic and panics.
pub const MAX_NOTIFY_DEPTH: u32 = 10;

bitflags! {
    /// Occupancy bits for the subscriber slots of one record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct SlotFlags: u8 {
        /// Fast slot 0 holds a subscriber.
        const SLOT_0 = 1 << 0;
        /// Fast slot 1 holds a subscriber.
        const SLOT_1 = 1 << 1;
        /// Fast slot 2 holds a subscriber.
        const SLOT_2 = 1 << 2;
        /// The overflow vector is non-empty.
        const REST = 1 << 3;
    }
}

/// An immutable snapshot of one scalar change. Built once per `notify`
/// call and shared by every queue entry of that call.
#[derive(Debug)]
pub struct ChangeRecord<T> {
    pub new_value: T,
    pub old_value: T,
    pub flags: ChangeFlags,
}

/// Delivery snapshot buffer. Four inline entries cover the fast slots plus
/// one overflow subscriber without touching the heap.
type Snapshot<S> = SmallVec<[Rc<S>; 4]>;

struct SlotStore<S: ?Sized> {
    sf: SlotFlags,
    s0: Option<Rc<S>>,
    s1: Option<Rc<S>>,
    s2: Option<Rc<S>>,
    /// Overflow for subscribers beyond the three fast slots. Empty until a
    /// fourth subscriber arrives; `Vec::new` does not allocate.
    rest: Vec<Rc<S>>,
    count: usize,
}

/// Slot bookkeeping shared by both record kinds. All methods take `&self`
/// and borrow only transiently, never across a handler invocation.
struct Slots<S: ?Sized> {
    inner: RefCell<SlotStore<S>>,
}

impl<S: ?Sized> Slots<S> {
    fn new() -> Self {
        Self {
            inner: RefCell::new(SlotStore {
                sf: SlotFlags::empty(),
                s0: None,
                s1: None,
                s2: None,
                rest: Vec::new(),
                count: 0,
            }),
        }
    }

    fn add(&self, subscriber: Rc<S>) -> bool {
        if self.has(&subscriber) {
            return false;
        }
        let mut inner = self.inner.borrow_mut();
        let sf = inner.sf;
        if !sf.contains(SlotFlags::SLOT_0) {
            inner.s0 = Some(subscriber);
            inner.sf |= SlotFlags::SLOT_0;
        } else if !sf.contains(SlotFlags::SLOT_1) {
            inner.s1 = Some(subscriber);
            inner.sf |= SlotFlags::SLOT_1;
        } else if !sf.contains(SlotFlags::SLOT_2) {
            inner.s2 = Some(subscriber);
            inner.sf |= SlotFlags::SLOT_2;
        } else {
            inner.rest.push(subscriber);
            inner.sf |= SlotFlags::REST;
        }
        inner.count += 1;
        true
    }

    fn has(&self, subscriber: &Rc<S>) -> bool {
        // Checking the occupancy bit before the pointer comparison keeps
        // the common miss case on the bitmask alone.
        let inner = self.inner.borrow();
        let sf = inner.sf;
        if sf.contains(SlotFlags::SLOT_0)
            && matches!(&inner.s0, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            return true;
        }
        if sf.contains(SlotFlags::SLOT_1)
            && matches!(&inner.s1, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            return true;
        }
        if sf.contains(SlotFlags::SLOT_2)
            && matches!(&inner.s2, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            return true;
        }
        if sf.contains(SlotFlags::REST) {
            return inner.rest.iter().any(|s| Rc::ptr_eq(s, subscriber));
        }
        false
    }

    fn remove(&self, subscriber: &Rc<S>) -> bool {
        let mut inner = self.inner.borrow_mut();
        let sf = inner.sf;
        if sf.contains(SlotFlags::SLOT_0)
            && matches!(&inner.s0, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            inner.s0 = None;
            inner.sf.remove(SlotFlags::SLOT_0);
            inner.count -= 1;
            return true;
        }
        if sf.contains(SlotFlags::SLOT_1)
            && matches!(&inner.s1, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            inner.s1 = None;
            inner.sf.remove(SlotFlags::SLOT_1);
            inner.count -= 1;
            return true;
        }
        if sf.contains(SlotFlags::SLOT_2)
            && matches!(&inner.s2, Some(s) if Rc::ptr_eq(s, subscriber))
        {
            inner.s2 = None;
            inner.sf.remove(SlotFlags::SLOT_2);
            inner.count -= 1;
            return true;
        }
        if sf.contains(SlotFlags::REST) {
            if let Some(pos) = inner.rest.iter().position(|s| Rc::ptr_eq(s, subscriber)) {
                inner.rest.remove(pos);
                if inner.rest.is_empty() {
                    inner.sf.remove(SlotFlags::REST);
                }
                inner.count -= 1;
                return true;
            }
        }
        false
    }

    fn any(&self) -> bool {
        !self.inner.borrow().sf.is_empty()
    }

    fn count(&self) -> usize {
        self.inner.borrow().count
    }

    /// Snapshot the current subscribers in slot order (0, 1, 2, then
    /// overflow insertion order). Fast slots are stable `Rc` handles read
    /// directly; the overflow is copied so handler mutations during the
    /// delivery of this snapshot cannot affect it.
    fn snapshot(&self) -> Snapshot<S> {
        let inner = self.inner.borrow();
        let mut snap = Snapshot::new();
        if let Some(s) = &inner.s0 {
            snap.push(Rc::clone(s));
        }
        if let Some(s) = &inner.s1 {
            snap.push(Rc::clone(s));
        }
        if let Some(s) = &inner.s2 {
            snap.push(Rc::clone(s));
        }
        for s in &inner.rest {
            snap.push(Rc::clone(s));
        }
        snap
    }
}

struct Pending<T> {
    subscriber: Rc<dyn Subscriber<T>>,
    change: Rc<ChangeRecord<T>>,
}

/// Subscriber storage and scalar change fan-out for one observable.
///
/// Owned exclusively by its observable entity; subscribers interact with
/// it only through `add`/`remove` (usually via the entity's
/// [`Subscribable`](crate::subscriber::Subscribable) surface) and receive
/// deliveries through [`notify`](Self::notify).
pub struct SubscriberRecord<T> {
    slots: Slots<dyn Subscriber<T>>,
    /// Pending deliveries, at most one entry per subscriber. Cleared by
    /// draining, never reallocated, so steady-state flushes stay off the
    /// allocator.
    queue: RefCell<VecDeque<Pending<T>>>,
    depth: Cell<u32>,
}

impl<T> SubscriberRecord<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Slots::new(),
            queue: RefCell::new(VecDeque::new()),
            depth: Cell::new(0),
        }
    }

    /// Register `subscriber` in the first free fast slot, or the overflow
    /// once all three are taken. Returns `false` without mutation when it
    /// is already registered.
    pub fn add(&self, subscriber: Rc<dyn Subscriber<T>>) -> bool {
        self.slots.add(subscriber)
    }

    /// Whether `subscriber` is currently registered.
    #[must_use]
    pub fn has(&self, subscriber: &Rc<dyn Subscriber<T>>) -> bool {
        self.slots.has(subscriber)
    }

    /// Remove `subscriber` from whichever slot holds it. Returns `false`
    /// when it is not registered.
    pub fn remove(&self, subscriber: &Rc<dyn Subscriber<T>>) -> bool {
        self.slots.remove(subscriber)
    }

    /// Whether at least one slot is occupied. O(1) off the occupancy
    /// bitmask alone.
    #[must_use]
    pub fn any(&self) -> bool {
        self.slots.any()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.count()
    }
}

impl<T> Default for SubscriberRecord<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SubscriberRecord<T> {
    /// Fan one scalar change out to every registered subscriber.
    ///
    /// The current subscribers are snapshotted into the pending queue
    /// before any handler runs: handlers may add or remove subscribers
    /// mid-flush, but additions are not delivered in this flush and
    /// removals still receive the snapshotted delivery (callers suppress
    /// those with their own is-bound guards). A nested call from inside a
    /// handler merges into the outer flush's queue (replacing a
    /// still-pending entry for the same subscriber) and is drained by the
    /// outermost call, which loops until the queue is truly empty.
    ///
    /// # Panics
    ///
    /// Panics when re-entrant notifications nest deeper than
    /// [`MAX_NOTIFY_DEPTH`].
    pub fn notify(&self, new_value: &T, old_value: &T, flags: ChangeFlags) {
        if self.slots.count() == 0 {
            return;
        }
        let change = Rc::new(ChangeRecord {
            new_value: new_value.clone(),
            old_value: old_value.clone(),
            flags,
        });
        {
            let snapshot = self.slots.snapshot();
            let mut queue = self.queue.borrow_mut();
            for subscriber in snapshot {
                match queue
                    .iter_mut()
                    .find(|p| Rc::ptr_eq(&p.subscriber, &subscriber))
                {
                    // Still pending from the outer flush: last write wins.
                    Some(pending) => pending.change = Rc::clone(&change),
                    None => queue.push_back(Pending {
                        subscriber,
                        change: Rc::clone(&change),
                    }),
                }
            }
        }
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        if depth > 1 {
            if depth > MAX_NOTIFY_DEPTH {
                tracing::error!(depth, "recursive change notification");
                panic!("recursive change notification (depth {depth})");
            }
            // Nested inside an in-progress flush; the outermost call
            // drains the merged queue.
            return;
        }
        // Drain until truly empty: entries enqueued by handlers during
        // this loop are delivered before the flush ends. Each entry is
        // removed before its handler runs, so a handler re-notifying this
        // record enqueues fresh state instead of re-triggering itself from
        // the same entry.
        loop {
            let pending = self.queue.borrow_mut().pop_front();
            let Some(pending) = pending else { break };
            let change = pending.change;
            pending
                .subscriber
                .handle_change(&change.new_value, &change.old_value, change.flags);
        }
        self.depth.set(0);
    }
}

/// Subscriber storage and collection change fan-out for one observable
/// collection.
///
/// Collection fan-out has no queueing and no re-entrancy guard: the slots
/// are snapshotted and each subscriber is invoked synchronously in slot
/// order with the same [`IndexMap`].
pub struct CollectionSubscriberRecord {
    slots: Slots<dyn CollectionSubscriber>,
}

impl CollectionSubscriberRecord {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Slots::new(),
        }
    }

    /// Register `subscriber`. Returns `false` without mutation when it is
    /// already registered.
    pub fn add(&self, subscriber: Rc<dyn CollectionSubscriber>) -> bool {
        self.slots.add(subscriber)
    }

    /// Whether `subscriber` is currently registered.
    #[must_use]
    pub fn has(&self, subscriber: &Rc<dyn CollectionSubscriber>) -> bool {
        self.slots.has(subscriber)
    }

    /// Remove `subscriber`. Returns `false` when it is not registered.
    pub fn remove(&self, subscriber: &Rc<dyn CollectionSubscriber>) -> bool {
        self.slots.remove(subscriber)
    }

    /// Whether at least one slot is occupied.
    #[must_use]
    pub fn any(&self) -> bool {
        self.slots.any()
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots.count()
    }

    /// Deliver `index_map` to every registered subscriber in slot order.
    pub fn notify_collection(&self, index_map: &IndexMap, flags: ChangeFlags) {
        for subscriber in self.slots.snapshot() {
            subscriber.handle_collection_change(index_map, flags);
        }
    }
}

impl Default for CollectionSubscriberRecord {
    fn default() -> Self {
        Self::new()
    }
}
