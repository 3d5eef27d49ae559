#![forbid(unsafe_code)]

//! Property-to-property bindings.
//!
//! A [`PropertyBinding`] connects a source observer to a target observer
//! under a [`BindingMode`] policy. Binding registers the needed
//! subscriptions; unbinding tears them down again.
//!
//! # Resource lifetime
//!
//! `unbind` must be called for every `bind`. Dropping a bound binding's
//! last user-held `Rc` does not unsubscribe it: the source observer still
//! holds a registration `Rc`, so the binding stays alive and keeps
//! forwarding until the observer itself is dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use heddle_observation::{ChangeFlags, PropertyObserver, Subscribable, Subscriber};

use crate::mode::BindingMode;

/// Identity of one binding, used to key side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        thread_local! {
            static NEXT: Cell<u64> = const { Cell::new(0) };
        }
        NEXT.with(|next| {
            let id = next.get();
            next.set(id + 1);
            BindingId(id)
        })
    }
}

/// Moves values between a source and a target [`PropertyObserver`]
/// according to the current [`BindingMode`].
pub struct PropertyBinding<T> {
    id: BindingId,
    mode: Cell<BindingMode>,
    source: Rc<PropertyObserver<T>>,
    target: Rc<PropertyObserver<T>>,
    bound: Cell<bool>,
    /// The write-back subscriber registered on the target while a
    /// `FROM_VIEW` direction is active.
    target_subscriber: RefCell<Option<Rc<BindingTargetSubscriber<T>>>>,
}

impl<T> PropertyBinding<T> {
    #[must_use]
    pub fn new(
        source: Rc<PropertyObserver<T>>,
        target: Rc<PropertyObserver<T>>,
        mode: BindingMode,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: BindingId::next(),
            mode: Cell::new(mode),
            source,
            target,
            bound: Cell::new(false),
            target_subscriber: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    #[must_use]
    pub fn mode(&self) -> BindingMode {
        self.mode.get()
    }

    /// Install a new mode policy. Takes effect at the next `bind`; an
    /// already-bound binding keeps its current subscriptions.
    pub fn set_mode(&self, mode: BindingMode) {
        self.mode.set(mode);
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    #[must_use]
    pub fn source(&self) -> &Rc<PropertyObserver<T>> {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &Rc<PropertyObserver<T>> {
        &self.target
    }
}

impl<T: Clone + PartialEq + 'static> PropertyBinding<T> {
    /// Activate the binding: push the initial value and subscribe per the
    /// current mode. No-op when already bound.
    pub fn bind(self: &Rc<Self>, flags: ChangeFlags) {
        if self.bound.get() {
            return;
        }
        self.bound.set(true);
        let mode = self.mode.get();
        if mode.intersects(BindingMode::TO_VIEW | BindingMode::ONE_TIME) {
            self.update_target(self.source.get(), flags | ChangeFlags::FROM_BIND);
        }
        if mode.contains(BindingMode::TO_VIEW) {
            self.source
                .subscribe(Rc::clone(self) as Rc<dyn Subscriber<T>>);
        }
        if mode.contains(BindingMode::FROM_VIEW) {
            let subscriber = Rc::new(BindingTargetSubscriber {
                binding: Rc::downgrade(self),
            });
            self.target
                .subscribe(Rc::clone(&subscriber) as Rc<dyn Subscriber<T>>);
            *self.target_subscriber.borrow_mut() = Some(subscriber);
        }
    }

    /// Deactivate the binding: unsubscribe both ends. No-op when not
    /// bound. A flush snapshotted before this call may still deliver to
    /// the binding once; those deliveries are dropped by the bound guard.
    pub fn unbind(self: &Rc<Self>, _flags: ChangeFlags) {
        if !self.bound.get() {
            return;
        }
        self.bound.set(false);
        let this = Rc::clone(self) as Rc<dyn Subscriber<T>>;
        self.source.unsubscribe(&this);
        if let Some(subscriber) = self.target_subscriber.borrow_mut().take() {
            let subscriber = subscriber as Rc<dyn Subscriber<T>>;
            self.target.unsubscribe(&subscriber);
        }
    }

    /// Push `value` into the target observer.
    pub fn update_target(&self, value: T, flags: ChangeFlags) {
        self.target.set(value, flags | ChangeFlags::UPDATE_TARGET);
    }

    /// Push `value` back into the source observer.
    pub fn update_source(&self, value: T, flags: ChangeFlags) {
        self.source.set(value, flags | ChangeFlags::UPDATE_SOURCE);
    }
}

impl<T: Clone + PartialEq + 'static> Subscriber<T> for PropertyBinding<T> {
    fn handle_change(&self, new_value: &T, _old_value: &T, flags: ChangeFlags) {
        // Deliveries snapshotted before unbind still arrive; drop them.
        if !self.bound.get() {
            return;
        }
        self.update_target(new_value.clone(), flags);
    }
}

/// Subscriber on the target observer that writes diverging target values
/// back into the source. Holds the binding weakly; the binding owns the
/// strong reference for exactly as long as a `FROM_VIEW` subscription is
/// active.
pub struct BindingTargetSubscriber<T> {
    binding: Weak<PropertyBinding<T>>,
}

impl<T: Clone + PartialEq + 'static> Subscriber<T> for BindingTargetSubscriber<T> {
    fn handle_change(&self, new_value: &T, _old_value: &T, flags: ChangeFlags) {
        let Some(binding) = self.binding.upgrade() else {
            return;
        };
        if !binding.bound.get() {
            return;
        }
        if *new_value != binding.source.get() {
            binding.update_source(new_value.clone(), flags);
        }
    }
}
