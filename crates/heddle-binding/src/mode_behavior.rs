#![forbid(unsafe_code)]

//! Binding-mode behaviors: scoped overrides of a binding's mode policy.
//!
//! A behavior remembers the binding's mode at `bind` time and installs a
//! fixed mode in its place; `unbind` restores exactly the remembered mode.
//! Four named variants differ only in which fixed mode they install.
//!
//! # Resource lifetime
//!
//! Remembered modes live in an explicit side table keyed by [`BindingId`].
//! Every `bind` must be paired with an `unbind`; a binding discarded
//! without `unbind` leaves its entry (and its overridden mode) behind.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tracing::trace;

use heddle_observation::ChangeFlags;

use crate::binding::{BindingId, PropertyBinding};
use crate::mode::BindingMode;

/// Overrides a binding's mode for the duration of a bind/unbind scope.
pub struct BindingModeBehavior {
    name: &'static str,
    mode: BindingMode,
    original_modes: RefCell<FxHashMap<BindingId, BindingMode>>,
}

impl BindingModeBehavior {
    #[must_use]
    pub fn new(name: &'static str, mode: BindingMode) -> Self {
        Self {
            name,
            mode,
            original_modes: RefCell::new(FxHashMap::default()),
        }
    }

    /// Remember the binding's current mode and install this behavior's
    /// fixed mode.
    pub fn bind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        trace!(behavior = self.name, ?flags, "bind");
        self.original_modes
            .borrow_mut()
            .insert(binding.id(), binding.mode());
        binding.set_mode(self.mode);
    }

    /// Restore the mode remembered at `bind` time and drop the table
    /// entry. No-op for a binding this behavior never bound.
    pub fn unbind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        trace!(behavior = self.name, ?flags, "unbind");
        if let Some(original) = self.original_modes.borrow_mut().remove(&binding.id()) {
            binding.set_mode(original);
        }
    }
}

/// Forces a binding into `ONE_TIME` mode for the scope of its attachment.
pub struct OneTimeBindingBehavior {
    inner: BindingModeBehavior,
}

impl OneTimeBindingBehavior {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: BindingModeBehavior::new("OneTimeBindingBehavior", BindingMode::ONE_TIME),
        }
    }

    pub fn bind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.bind(flags, binding);
    }

    pub fn unbind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.unbind(flags, binding);
    }
}

impl Default for OneTimeBindingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

/// Forces a binding into `TO_VIEW` mode for the scope of its attachment.
pub struct ToViewBindingBehavior {
    inner: BindingModeBehavior,
}

impl ToViewBindingBehavior {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: BindingModeBehavior::new("ToViewBindingBehavior", BindingMode::TO_VIEW),
        }
    }

    pub fn bind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.bind(flags, binding);
    }

    pub fn unbind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.unbind(flags, binding);
    }
}

impl Default for ToViewBindingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

/// Forces a binding into `FROM_VIEW` mode for the scope of its attachment.
pub struct FromViewBindingBehavior {
    inner: BindingModeBehavior,
}

impl FromViewBindingBehavior {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: BindingModeBehavior::new("FromViewBindingBehavior", BindingMode::FROM_VIEW),
        }
    }

    pub fn bind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.bind(flags, binding);
    }

    pub fn unbind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.unbind(flags, binding);
    }
}

impl Default for FromViewBindingBehavior {
    fn default() -> Self {
        Self::new()
    }
}

/// Forces a binding into `TWO_WAY` mode for the scope of its attachment.
pub struct TwoWayBindingBehavior {
    inner: BindingModeBehavior,
}

impl TwoWayBindingBehavior {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: BindingModeBehavior::new("TwoWayBindingBehavior", BindingMode::TWO_WAY),
        }
    }

    pub fn bind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.bind(flags, binding);
    }

    pub fn unbind<T>(&self, flags: ChangeFlags, binding: &PropertyBinding<T>) {
        self.inner.unbind(flags, binding);
    }
}

impl Default for TwoWayBindingBehavior {
    fn default() -> Self {
        Self::new()
    }
}
