#![forbid(unsafe_code)]

//! Update-direction policy of a binding.

use bitflags::bitflags;

bitflags! {
    /// Which directions a binding moves values in, and when.
    ///
    /// `TWO_WAY` is the union of the two directional bits, so
    /// `mode.contains(BindingMode::TO_VIEW)` holds for both `TO_VIEW` and
    /// `TWO_WAY` bindings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BindingMode: u8 {
        /// Evaluate the source once at bind time; never subscribe.
        const ONE_TIME = 1 << 0;
        /// Source changes flow to the target.
        const TO_VIEW = 1 << 1;
        /// Target changes flow back to the source.
        const FROM_VIEW = 1 << 2;
        /// Both directions.
        const TWO_WAY = Self::TO_VIEW.bits() | Self::FROM_VIEW.bits();
    }
}
