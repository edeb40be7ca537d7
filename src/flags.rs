//! Per-call resolution flags.

use std::ops::{BitOr, BitOrAssign};

/// Flags modifying a single resolution call.
///
/// Flags combine with `|`. `OPTIONAL` turns a missing provider into
/// `Ok(None)`, `SELF_ONLY` stops delegation to the parent container, and
/// `SKIP_SELF` starts the lookup at the parent even when the token is bound
/// locally.
///
/// # Examples
///
/// ```rust
/// use strata_di::InjectFlags;
///
/// let flags = InjectFlags::OPTIONAL | InjectFlags::SELF_ONLY;
/// assert!(flags.contains(InjectFlags::OPTIONAL));
/// assert!(!flags.contains(InjectFlags::SKIP_SELF));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InjectFlags(u8);

impl InjectFlags {
    /// No modifiers.
    pub const DEFAULT: InjectFlags = InjectFlags(0);
    /// Missing provider yields `None` instead of an error.
    pub const OPTIONAL: InjectFlags = InjectFlags(1 << 0);
    /// Never delegate to the parent container.
    pub const SELF_ONLY: InjectFlags = InjectFlags(1 << 1);
    /// Start at the parent even when bound locally.
    pub const SKIP_SELF: InjectFlags = InjectFlags(1 << 2);
    // Set internally when a lookup crosses a parent boundary; drives
    // visibility masking of private bindings.
    pub(crate) const FROM_CHILD: InjectFlags = InjectFlags(1 << 3);

    /// Returns true when every bit of `other` is set in `self`.
    pub fn contains(self, other: InjectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with the bits of `other` cleared.
    pub(crate) fn without(self, other: InjectFlags) -> InjectFlags {
        InjectFlags(self.0 & !other.0)
    }
}

impl BitOr for InjectFlags {
    type Output = InjectFlags;

    fn bitor(self, rhs: InjectFlags) -> InjectFlags {
        InjectFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for InjectFlags {
    fn bitor_assign(&mut self, rhs: InjectFlags) {
        self.0 |= rhs.0;
    }
}
