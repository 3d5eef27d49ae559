#![forbid(unsafe_code)]

//! Scalar property observation.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use crate::flags::ChangeFlags;
use crate::record::SubscriberRecord;
use crate::subscriber::{Subscribable, Subscriber};

/// Observes a single scalar value and fans changes out to subscribers.
///
/// The subscriber record is created on the first subscribe call, so a
/// property nobody observes costs its value cell and an empty `OnceCell`.
///
/// # Invariants
///
/// 1. `set` with a value equal (by `PartialEq`) to the current one is a
///    no-op: no swap, no notification.
/// 2. No interior borrow is held while subscribers run; handlers may read
///    or set this property re-entrantly.
pub struct PropertyObserver<T> {
    value: RefCell<T>,
    subs: OnceCell<SubscriberRecord<T>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for PropertyObserver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyObserver")
            .field("value", &self.value.borrow())
            .field(
                "subscriber_count",
                &self.subs.get().map_or(0, SubscriberRecord::count),
            )
            .finish()
    }
}

impl<T: Clone + PartialEq> PropertyObserver<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            subs: OnceCell::new(),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Install a new value and fan the change out.
    ///
    /// No-op when `value` equals the current value.
    pub fn set(&self, value: T, flags: ChangeFlags) {
        let old_value = {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        if let Some(subs) = self.subs.get() {
            subs.notify(&value, &old_value, flags);
        }
    }

    /// Whether anyone is currently subscribed.
    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.subs.get().is_some_and(SubscriberRecord::any)
    }
}

impl<T: Clone + PartialEq> Subscribable<T> for PropertyObserver<T> {
    fn subscribe(&self, subscriber: Rc<dyn Subscriber<T>>) -> bool {
        self.subs.get_or_init(SubscriberRecord::new).add(subscriber)
    }

    fn unsubscribe(&self, subscriber: &Rc<dyn Subscriber<T>>) -> bool {
        match self.subs.get() {
            Some(subs) => subs.remove(subscriber),
            None => false,
        }
    }
}
