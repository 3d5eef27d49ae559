#![forbid(unsafe_code)]

//! Propagation-context flags threaded through every notification call.
//!
//! The observation core never inspects these bits; it forwards them
//! verbatim from the mutation site to every subscriber. Consumers (the
//! binding layer, behaviors) give individual bits meaning.

use bitflags::bitflags;

bitflags! {
    /// Context bits describing where a change originated and which
    /// direction it is travelling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u16 {
        /// The change was raised while a binding is being attached.
        const FROM_BIND = 1 << 0;
        /// The change was raised while a binding is being detached.
        const FROM_UNBIND = 1 << 1;
        /// The change is flowing from the source model toward the view.
        const UPDATE_TARGET = 1 << 2;
        /// The change is flowing from the view back toward the source model.
        const UPDATE_SOURCE = 1 << 3;
    }
}
