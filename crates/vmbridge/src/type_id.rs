// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire type identifiers.
//!
//! A [`WireTypeId`] is a 32-bit value: bits 0-15 hold the type tag, bit 16
//! is the array flag and bits 17+ are reserved for future modifiers
//! (by-reference, out parameters).
//!
//! | Tags | Meaning |
//! |------|---------|
//! | 0-99 | Built-in scalars supported natively by script buffers |
//! | 100-999 | Types with added native-side support (char, pointer-sized int) |
//! | 1000+ | Types registered at startup, assigned monotonically |

use std::fmt;

/// Size of the `u32le` total-length field that starts every wire buffer.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Array modifier flag (bit 16).
pub const ARRAY_FLAG: u32 = 1 << 16;

/// Mask selecting the type tag (bits 0-15).
pub const TAG_MASK: u32 = 0xFFFF;

/// First tag handed out to registered types.
pub const REGISTERED_TAG_START: u16 = 1000;

/// Returns `true` if the raw id carries the array flag.
#[inline]
pub const fn has_array_flag(raw: u32) -> bool {
    raw & ARRAY_FLAG != 0
}

/// Clears the array flag from a raw id.
#[inline]
pub const fn strip_array_flag(raw: u32) -> u32 {
    raw & !ARRAY_FLAG
}

/// Wire type identifier (tag + modifier flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireTypeId(u32);

impl WireTypeId {
    pub const VOID: Self = Self(0);
    pub const U8: Self = Self(1);
    pub const I8: Self = Self(2);
    pub const U16: Self = Self(3);
    pub const I16: Self = Self(4);
    pub const U32: Self = Self(5);
    pub const I32: Self = Self(6);
    pub const I64: Self = Self(7);
    pub const F16: Self = Self(8);
    pub const F32: Self = Self(9);
    pub const F64: Self = Self(10);
    pub const BOOL: Self = Self(11);
    pub const STRING: Self = Self(12);
    pub const CHAR: Self = Self(100);
    pub const INT_PTR: Self = Self(101);

    /// Wrap a raw 32-bit id as read from the wire.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Id for a scalar tag, without modifier flags.
    #[inline]
    pub const fn from_tag(tag: u16) -> Self {
        Self(tag as u32)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn tag(self) -> u16 {
        (self.0 & TAG_MASK) as u16
    }

    #[inline]
    pub const fn is_array(self) -> bool {
        has_array_flag(self.0)
    }

    #[inline]
    pub const fn is_void(self) -> bool {
        self.0 == 0
    }

    /// "Array of" this id. Composing twice is a no-op: only one level of
    /// nesting is representable.
    #[inline]
    pub const fn array(self) -> Self {
        Self(self.0 | ARRAY_FLAG)
    }

    /// Element id of an array id (identity for scalars).
    #[inline]
    pub const fn element(self) -> Self {
        Self(strip_array_flag(self.0))
    }

    /// Key used for registry lookups: the bare tag, flags stripped.
    #[inline]
    pub(crate) const fn lookup_key(self) -> u16 {
        self.tag()
    }
}

impl fmt::Display for WireTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array() {
            write!(f, "{}[]", self.tag())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<WireTypeId> for u32 {
    fn from(id: WireTypeId) -> Self {
        id.0
    }
}

impl From<u32> for WireTypeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_flag_composition() {
        let id = WireTypeId::from_tag(REGISTERED_TAG_START);
        let arr = id.array();
        assert!(has_array_flag(arr.raw()));
        assert!(!has_array_flag(id.raw()));
        assert_eq!(strip_array_flag(arr.raw()), id.raw());
        assert_eq!(arr.element(), id);
        assert_eq!(arr.tag(), 1000);
        assert_eq!(arr.raw(), 1000 | ARRAY_FLAG);
    }

    #[test]
    fn test_array_of_array_collapses() {
        let arr = WireTypeId::I32.array();
        assert_eq!(arr.array(), arr);
    }

    #[test]
    fn test_reserved_bits_do_not_change_tag() {
        let id = WireTypeId::from_raw(WireTypeId::STRING.raw() | (1 << 17));
        assert_eq!(id.tag(), WireTypeId::STRING.tag());
        assert!(!id.is_array());
    }

    #[test]
    fn test_builtin_tag_ranges() {
        for id in [
            WireTypeId::VOID,
            WireTypeId::U8,
            WireTypeId::I8,
            WireTypeId::U16,
            WireTypeId::I16,
            WireTypeId::U32,
            WireTypeId::I32,
            WireTypeId::I64,
            WireTypeId::F16,
            WireTypeId::F32,
            WireTypeId::F64,
            WireTypeId::BOOL,
            WireTypeId::STRING,
        ] {
            assert!(id.tag() < 100);
        }
        assert!((100..1000).contains(&WireTypeId::CHAR.tag()));
        assert!((100..1000).contains(&WireTypeId::INT_PTR.tag()));
    }

    #[test]
    fn test_display() {
        assert_eq!(WireTypeId::U32.to_string(), "5");
        assert_eq!(WireTypeId::U32.array().to_string(), "5[]");
    }
}
