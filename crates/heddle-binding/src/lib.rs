#![forbid(unsafe_code)]

//! Binding layer: modes, property bindings, and mode behaviors.
//!
//! # Role in Heddle
//! `heddle-binding` consumes the subscribe/notify contract of
//! `heddle-observation`: a [`PropertyBinding`] registers itself (and a
//! write-back subscriber) on the observers at its two ends and moves
//! values between them according to its [`BindingMode`].
//!
//! # Primary responsibilities
//! - **BindingMode**: the update-direction policy bits.
//! - **PropertyBinding**: the source-to-target connection with bind/unbind
//!   lifecycle.
//! - **Mode behaviors**: scoped overrides that install a fixed mode at
//!   bind time and restore the previous one at unbind.
//!
//! # How it fits in the system
//! Higher layers (template compilation, DOM accessors) construct bindings
//! and behaviors; this crate neither parses expressions nor touches a
//! render surface.

pub mod binding;
pub mod mode;
pub mod mode_behavior;

pub use binding::{BindingId, BindingTargetSubscriber, PropertyBinding};
pub use mode::BindingMode;
pub use mode_behavior::{
    BindingModeBehavior, FromViewBindingBehavior, OneTimeBindingBehavior, ToViewBindingBehavior,
    TwoWayBindingBehavior,
};
