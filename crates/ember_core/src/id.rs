//! # Proxy Identifiers
//!
//! A [`ProxyId`] names one occupancy of one [`ProxyPool`](crate::ProxyPool)
//! slot. Removing a proxy bumps the slot's generation, so every id handed
//! out for the previous occupant stops resolving.

/// Handle to a live proxy: pool slot in the low half, slot generation in the
/// high half.
///
/// Parent and ancestor links are stored as ids, so an emitter that is swept
/// before its children leaves them holding ids that look up as `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProxyId(u64);

impl ProxyId {
    /// Id that never resolves; carried by proxies not yet inserted.
    pub const NULL: Self = Self(u64::MAX);

    /// Packs a slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Pool slot.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// How many times the slot had been vacated when this id was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns true for [`ProxyId::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Packed form, stable for sorting and hashing.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Default for ProxyId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for ProxyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "proxy#null")
        } else {
            write!(f, "proxy#{}v{}", self.index(), self.generation())
        }
    }
}
