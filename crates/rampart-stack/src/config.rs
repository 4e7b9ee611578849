// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Protection layer selection.

/// Which integrity layers a [`GuardedStack`](crate::GuardedStack) maintains.
///
/// The value is fixed at creation time: the buffer layout depends on
/// `canary`, so it cannot change while a buffer is allocated.
///
/// Capacity and size range checks run whenever `verify` is set. Clearing
/// `verify` (unprotected mode) also clears every layer, see
/// [`Protection::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    /// Control-block sentinels and buffer guard words.
    pub canary: bool,
    /// Structural checksum recomputed on every mutation.
    pub hash: bool,
    /// Check that every unused slot still holds the poison value.
    pub poison: bool,
    /// Run verification before and after every operation.
    pub verify: bool,
}

impl Protection {
    /// Every layer enabled.
    pub const fn full() -> Self {
        Self {
            canary: true,
            hash: true,
            poison: true,
            verify: true,
        }
    }

    /// Canaries and guard words only.
    pub const fn canary_only() -> Self {
        Self {
            canary: true,
            hash: false,
            poison: false,
            verify: true,
        }
    }

    /// Checksum only.
    pub const fn hash_only() -> Self {
        Self {
            canary: false,
            hash: true,
            poison: false,
            verify: true,
        }
    }

    /// No layers, but capacity and size are still range checked.
    pub const fn none() -> Self {
        Self {
            canary: false,
            hash: false,
            poison: false,
            verify: true,
        }
    }

    /// No layers and no verification: an unchecked dynamic array.
    pub const fn unprotected() -> Self {
        Self {
            canary: false,
            hash: false,
            poison: false,
            verify: false,
        }
    }

    /// Selection made at build time through cargo features.
    ///
    /// The `unprotect` feature wins over `canary`, `hash` and `poison`.
    pub const fn from_features() -> Self {
        if cfg!(feature = "unprotect") {
            return Self::unprotected();
        }

        Self {
            canary: cfg!(feature = "canary"),
            hash: cfg!(feature = "hash"),
            poison: cfg!(feature = "poison"),
            verify: true,
        }
    }

    /// Forces every layer off when verification is disabled.
    pub const fn normalized(self) -> Self {
        if self.verify {
            self
        } else {
            Self::unprotected()
        }
    }
}

impl Default for Protection {
    fn default() -> Self {
        Self::from_features()
    }
}
