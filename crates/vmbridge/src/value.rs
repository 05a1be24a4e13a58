// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native type tokens and dynamic wire values.
//!
//! The registry is keyed by an explicit [`NativeType`] token instead of
//! runtime type introspection. [`WireValue`] carries a decoded value together
//! with enough information to recover its native type, so the writer can
//! check a value against a descriptor before encoding it.

use crate::error::{BridgeError, BridgeResult};
use std::borrow::Cow;
use std::fmt;

/// Stable token identifying a native type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    Void,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    I64,
    F16,
    F32,
    F64,
    Bool,
    String,
    Char,
    /// Pointer-sized integer; its wire width is fixed per registry.
    IntPtr,
    /// Type registered at startup, identified by a user-chosen name.
    Named(Cow<'static, str>),
    /// One-dimensional array. Only valid in signatures and values; never
    /// registered as a first-class type.
    Array(Box<NativeType>),
}

impl NativeType {
    /// Token for a registered type.
    pub const fn named(name: &'static str) -> Self {
        Self::Named(Cow::Borrowed(name))
    }

    pub fn array_of(element: NativeType) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Element type of an array token.
    pub fn element(&self) -> Option<&NativeType> {
        match self {
            Self::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Built-in tokens in tag order, as pre-registered by the registry.
    pub fn builtins() -> [NativeType; 15] {
        [
            Self::Void,
            Self::U8,
            Self::I8,
            Self::U16,
            Self::I16,
            Self::U32,
            Self::I32,
            Self::I64,
            Self::F16,
            Self::F32,
            Self::F64,
            Self::Bool,
            Self::String,
            Self::Char,
            Self::IntPtr,
        ]
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::U8 => f.write_str("u8"),
            Self::I8 => f.write_str("i8"),
            Self::U16 => f.write_str("u16"),
            Self::I16 => f.write_str("i16"),
            Self::U32 => f.write_str("u32"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::F16 => f.write_str("f16"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::Char => f.write_str("char"),
            Self::IntPtr => f.write_str("isize"),
            Self::Named(name) => f.write_str(name),
            Self::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// IEEE 754 binary16 value, stored as raw bits.
///
/// Equality is bitwise, so `-0.0 != 0.0` and identical NaN payloads compare
/// equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Half(u16);

impl Half {
    pub const ZERO: Self = Self(0x0000);
    pub const NEG_ZERO: Self = Self(0x8000);
    pub const ONE: Self = Self(0x3C00);
    pub const MAX: Self = Self(0x7BFF);
    pub const MIN: Self = Self(0xFBFF);
    pub const INFINITY: Self = Self(0x7C00);
    pub const NEG_INFINITY: Self = Self(0xFC00);

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Convert from `f32`, rounding to nearest even.
    pub fn from_f32(value: f32) -> Self {
        let x = value.to_bits();
        let sign = ((x >> 16) & 0x8000) as u16;
        let exp = ((x >> 23) & 0xFF) as i32;
        let man = x & 0x007F_FFFF;

        if exp == 0xFF {
            let nan = if man != 0 {
                0x0200 | (man >> 13) as u16
            } else {
                0
            };
            return Self(sign | 0x7C00 | nan);
        }

        let half_exp = exp - 127 + 15;
        if half_exp >= 0x1F {
            return Self(sign | 0x7C00);
        }

        if half_exp <= 0 {
            if half_exp < -10 {
                return Self(sign);
            }
            let man = man | 0x0080_0000;
            let shift = (14 - half_exp) as u32;
            let half_man = man >> shift;
            let round_bit = 1u32 << (shift - 1);
            let rem = man & ((round_bit << 1) - 1);
            let mut result = half_man;
            if rem > round_bit || (rem == round_bit && result & 1 != 0) {
                result += 1;
            }
            return Self(sign | result as u16);
        }

        let rem = man & 0x1FFF;
        // A carry out of the mantissa bumps the exponent, up to infinity.
        let mut result = ((half_exp as u32) << 10) | (man >> 13);
        if rem > 0x1000 || (rem == 0x1000 && result & 1 != 0) {
            result += 1;
        }
        Self(sign | result as u16)
    }

    pub fn to_f32(self) -> f32 {
        let h = u32::from(self.0);
        let negative = h & 0x8000 != 0;
        let exp = (h >> 10) & 0x1F;
        let man = h & 0x03FF;

        if exp == 0 {
            let magnitude = man as f32 * (1.0 / 16_777_216.0);
            return if negative { -magnitude } else { magnitude };
        }

        let sign = (h & 0x8000) << 16;
        let bits = if exp == 0x1F {
            sign | 0x7F80_0000 | (man << 13)
        } else {
            sign | ((exp + 112) << 23) | (man << 13)
        };
        f32::from_bits(bits)
    }
}

impl From<f32> for Half {
    fn from(value: f32) -> Self {
        Self::from_f32(value)
    }
}

impl From<Half> for f32 {
    fn from(value: Half) -> Self {
        value.to_f32()
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

/// A dynamically typed value crossing the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Void,
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    I64(i64),
    F16(Half),
    F32(f32),
    F64(f64),
    Bool(bool),
    String(String),
    Char(char),
    /// Pointer-sized integer, widened to 64 bits in memory.
    IntPtr(i64),
    /// Array with its element type, so empty arrays stay typed.
    Array(NativeType, Vec<WireValue>),
    /// Value of a registered record type, fields in declaration order.
    Record(NativeType, Vec<WireValue>),
}

macro_rules! impl_as_scalar {
    ($name:ident, $variant:ident, $type:ty) => {
        pub fn $name(&self) -> Option<$type> {
            match self {
                Self::$variant(v) => Some(*v),
                _ => None,
            }
        }
    };
}

impl WireValue {
    /// Native type of this value, as checked against descriptors.
    pub fn native_type(&self) -> NativeType {
        match self {
            Self::Void => NativeType::Void,
            Self::U8(_) => NativeType::U8,
            Self::I8(_) => NativeType::I8,
            Self::U16(_) => NativeType::U16,
            Self::I16(_) => NativeType::I16,
            Self::U32(_) => NativeType::U32,
            Self::I32(_) => NativeType::I32,
            Self::I64(_) => NativeType::I64,
            Self::F16(_) => NativeType::F16,
            Self::F32(_) => NativeType::F32,
            Self::F64(_) => NativeType::F64,
            Self::Bool(_) => NativeType::Bool,
            Self::String(_) => NativeType::String,
            Self::Char(_) => NativeType::Char,
            Self::IntPtr(_) => NativeType::IntPtr,
            Self::Array(element, _) => NativeType::array_of(element.clone()),
            Self::Record(ty, _) => ty.clone(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    impl_as_scalar!(as_u8, U8, u8);
    impl_as_scalar!(as_i8, I8, i8);
    impl_as_scalar!(as_u16, U16, u16);
    impl_as_scalar!(as_i16, I16, i16);
    impl_as_scalar!(as_u32, U32, u32);
    impl_as_scalar!(as_i32, I32, i32);
    impl_as_scalar!(as_i64, I64, i64);
    impl_as_scalar!(as_f16, F16, Half);
    impl_as_scalar!(as_f32, F32, f32);
    impl_as_scalar!(as_f64, F64, f64);
    impl_as_scalar!(as_bool, Bool, bool);
    impl_as_scalar!(as_char, Char, char);
    impl_as_scalar!(as_int_ptr, IntPtr, i64);

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Items of an array value.
    pub fn as_array(&self) -> Option<&[WireValue]> {
        match self {
            Self::Array(_, items) => Some(items),
            _ => None,
        }
    }

    /// Fields of a record value.
    pub fn as_record(&self) -> Option<&[WireValue]> {
        match self {
            Self::Record(_, fields) => Some(fields),
            _ => None,
        }
    }

    /// Fields of a record value of type `expected`.
    pub fn expect_record(&self, expected: &NativeType) -> BridgeResult<&[WireValue]> {
        match self {
            Self::Record(ty, fields) if ty == expected => Ok(fields),
            other => Err(BridgeError::TypeMismatch {
                expected: expected.clone(),
                found: other.native_type(),
            }),
        }
    }
}

macro_rules! impl_from_scalar {
    ($type:ty, $variant:ident) => {
        impl From<$type> for WireValue {
            fn from(v: $type) -> Self {
                Self::$variant(v)
            }
        }
    };
}

impl_from_scalar!(u8, U8);
impl_from_scalar!(i8, I8);
impl_from_scalar!(u16, U16);
impl_from_scalar!(i16, I16);
impl_from_scalar!(u32, U32);
impl_from_scalar!(i32, I32);
impl_from_scalar!(i64, I64);
impl_from_scalar!(Half, F16);
impl_from_scalar!(f32, F32);
impl_from_scalar!(f64, F64);
impl_from_scalar!(bool, Bool);
impl_from_scalar!(String, String);
impl_from_scalar!(char, Char);

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<()> for WireValue {
    fn from((): ()) -> Self {
        Self::Void
    }
}

/// Mapping between a Rust type and its wire representation.
///
/// Implemented for the built-in scalars, `String`, `char`, `isize`,
/// [`Half`], `()` and `Vec<T>`; record types get an implementation from
/// `#[derive(WireRecord)]`.
pub trait NativeValue: Sized {
    fn native_type() -> NativeType;
    fn into_wire(self) -> WireValue;
    fn from_wire(value: WireValue) -> BridgeResult<Self>;
}

fn mismatch<T>(expected: NativeType, found: &WireValue) -> BridgeResult<T> {
    Err(BridgeError::TypeMismatch {
        expected,
        found: found.native_type(),
    })
}

macro_rules! impl_native_scalar {
    ($type:ty, $variant:ident) => {
        impl NativeValue for $type {
            fn native_type() -> NativeType {
                NativeType::$variant
            }

            fn into_wire(self) -> WireValue {
                WireValue::$variant(self)
            }

            fn from_wire(value: WireValue) -> BridgeResult<Self> {
                match value {
                    WireValue::$variant(v) => Ok(v),
                    other => mismatch(NativeType::$variant, &other),
                }
            }
        }
    };
}

impl_native_scalar!(u8, U8);
impl_native_scalar!(i8, I8);
impl_native_scalar!(u16, U16);
impl_native_scalar!(i16, I16);
impl_native_scalar!(u32, U32);
impl_native_scalar!(i32, I32);
impl_native_scalar!(i64, I64);
impl_native_scalar!(Half, F16);
impl_native_scalar!(f32, F32);
impl_native_scalar!(f64, F64);
impl_native_scalar!(bool, Bool);
impl_native_scalar!(String, String);
impl_native_scalar!(char, Char);

impl NativeValue for () {
    fn native_type() -> NativeType {
        NativeType::Void
    }

    fn into_wire(self) -> WireValue {
        WireValue::Void
    }

    fn from_wire(value: WireValue) -> BridgeResult<Self> {
        match value {
            WireValue::Void => Ok(()),
            other => mismatch(NativeType::Void, &other),
        }
    }
}

impl NativeValue for isize {
    fn native_type() -> NativeType {
        NativeType::IntPtr
    }

    fn into_wire(self) -> WireValue {
        WireValue::IntPtr(self as i64)
    }

    fn from_wire(value: WireValue) -> BridgeResult<Self> {
        match value {
            WireValue::IntPtr(v) => isize::try_from(v).map_err(|_| BridgeError::InvalidValue {
                reason: format!("pointer value {:#x} does not fit this process", v),
            }),
            other => mismatch(NativeType::IntPtr, &other),
        }
    }
}

impl<T: NativeValue> NativeValue for Vec<T> {
    fn native_type() -> NativeType {
        NativeType::array_of(T::native_type())
    }

    fn into_wire(self) -> WireValue {
        WireValue::Array(
            T::native_type(),
            self.into_iter().map(NativeValue::into_wire).collect(),
        )
    }

    fn from_wire(value: WireValue) -> BridgeResult<Self> {
        match value {
            WireValue::Array(element, items) if element == T::native_type() => {
                items.into_iter().map(T::from_wire).collect()
            }
            other => mismatch(Self::native_type(), &other),
        }
    }
}
