#![forbid(unsafe_code)]

//! Subscriber and subscribable contracts.
//!
//! Subscribers are registered as `Rc<dyn …>` trait objects; the record
//! machinery treats the `Rc` allocation as the subscriber's identity
//! (compared with [`Rc::ptr_eq`]), so registering two clones of the same
//! `Rc` is idempotent while two separately-allocated subscribers of equal
//! shape are distinct.

use std::rc::Rc;

use crate::flags::ChangeFlags;
use crate::index_map::IndexMap;

/// A listener for scalar value changes.
pub trait Subscriber<T> {
    /// Invoked during a flush with the change's new value, old value, and
    /// the propagation flags the mutation site supplied.
    fn handle_change(&self, new_value: &T, old_value: &T, flags: ChangeFlags);
}

/// A listener for collection shape changes.
pub trait CollectionSubscriber {
    /// Invoked with the map describing the mutation. Every subscriber of
    /// one fan-out receives the same map.
    fn handle_collection_change(&self, index_map: &IndexMap, flags: ChangeFlags);
}

/// Capability of an observable entity to accept scalar subscribers.
///
/// Implemented by composition: the entity owns a lazily-created
/// [`SubscriberRecord`](crate::record::SubscriberRecord) and forwards both
/// calls to it.
pub trait Subscribable<T> {
    /// Register `subscriber`. Returns `false` (and changes nothing) when
    /// it is already registered; subscription is idempotent.
    fn subscribe(&self, subscriber: Rc<dyn Subscriber<T>>) -> bool;

    /// Remove `subscriber`. Returns `false` when it was not registered.
    /// Removal takes effect starting with the next flush; a flush already
    /// snapshotted still delivers to the removed subscriber.
    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber<T>>) -> bool;
}

/// Capability of an observable entity to accept collection subscribers.
pub trait CollectionSubscribable {
    /// Register `subscriber`. Idempotent; see [`Subscribable::subscribe`].
    fn subscribe(&self, subscriber: Rc<dyn CollectionSubscriber>) -> bool;

    /// Remove `subscriber`. Returns `false` when it was not registered.
    fn unsubscribe(&self, subscriber: &Rc<dyn CollectionSubscriber>) -> bool;
}
