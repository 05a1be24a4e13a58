// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the registry, the wire codecs and the call bridge.

use crate::type_id::WireTypeId;
use crate::value::NativeType;
use std::fmt;

/// Errors raised by the bridge.
///
/// Registry and codec errors are returned to the immediate caller.
/// Errors raised while servicing a call on the native side never cross the
/// call boundary: [`crate::bridge::CallBridge`] routes them to an
/// [`crate::bridge::ErrorSink`] instead.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// No descriptor registered under this wire type id.
    UnknownTypeId { id: WireTypeId },
    /// No descriptor registered for this native type.
    UnknownNativeType { native_type: NativeType },
    /// `register` called twice for the same native type.
    DuplicateType { native_type: NativeType },
    /// `override` called for a native type that was never registered.
    NotRegistered { native_type: NativeType },
    /// Mutation attempted after the registry was frozen.
    RegistryFrozen { operation: &'static str },
    /// Arrays are expressed with the array flag, never registered directly.
    ArrayTypeRejected { native_type: NativeType },
    /// The void descriptor is fixed.
    CannotOverrideVoid,
    /// A value's runtime type differs from the descriptor's native type.
    TypeMismatch {
        expected: NativeType,
        found: NativeType,
    },
    /// Read past the declared buffer length, or unterminated string.
    OutOfRange {
        offset: usize,
        bound: usize,
        reason: &'static str,
    },
    /// String bytes on the wire are not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// A value cannot be represented on the wire.
    InvalidValue { reason: String },
    /// Call resolution failed (unknown type, method, or parameter list).
    MissingTarget {
        type_name: String,
        method_name: String,
        params: Vec<NativeType>,
    },
    /// Wrong number of arguments or script expressions.
    ArityMismatch { expected: usize, found: usize },
    /// Dispatch scripts were already emitted for this registry.
    DispatchFinalized,
    /// The script host refused a generated function.
    Script { function: String, reason: String },
    /// Configuration could not be loaded.
    Config { reason: String },
    /// A native target panicked while servicing a call.
    Panic { target: String, message: String },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTypeId { id } => {
                write!(f, "wire type id {} has no registered native type", id)
            }
            Self::UnknownNativeType { native_type } => {
                write!(f, "native type {} has no registered wire type id", native_type)
            }
            Self::DuplicateType { native_type } => write!(
                f,
                "can't register type {} twice, use is_registered and/or override",
                native_type
            ),
            Self::NotRegistered { native_type } => write!(
                f,
                "can't override type {} that hasn't been registered",
                native_type
            ),
            Self::RegistryFrozen { operation } => {
                write!(f, "can't {} after the registry was frozen", operation)
            }
            Self::ArrayTypeRejected { native_type } => write!(
                f,
                "can't register array type {}, arrays are encoded with the array flag",
                native_type
            ),
            Self::CannotOverrideVoid => write!(f, "can't override the void type"),
            Self::TypeMismatch { expected, found } => write!(
                f,
                "type mismatch: expected {}, found {}",
                expected, found
            ),
            Self::OutOfRange {
                offset,
                bound,
                reason,
            } => write!(
                f,
                "read out of range at offset {} (bound {}): {}",
                offset, bound, reason
            ),
            Self::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 string at offset {}", offset),
            Self::InvalidValue { reason } => write!(f, "invalid value: {}", reason),
            Self::MissingTarget {
                type_name,
                method_name,
                params,
            } => {
                write!(f, "no native target {}::{}(", type_name, method_name)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ")")
            }
            Self::ArityMismatch { expected, found } => write!(
                f,
                "expected {} arguments, found {}",
                expected, found
            ),
            Self::DispatchFinalized => write!(f, "dispatch scripts were already finalized"),
            Self::Script { function, reason } => {
                write!(f, "script host rejected {}: {}", function, reason)
            }
            Self::Config { reason } => write!(f, "config error: {}", reason),
            Self::Panic { target, message } => write!(f, "{} panicked: {}", target, message),
        }
    }
}

impl std::error::Error for BridgeError {}

pub type BridgeResult<T> = core::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_out_of_range() {
        let err = BridgeError::OutOfRange {
            offset: 6,
            bound: 8,
            reason: "unexpected end of buffer",
        };
        assert_eq!(
            err.to_string(),
            "read out of range at offset 6 (bound 8): unexpected end of buffer"
        );
    }

    #[test]
    fn test_display_missing_target_lists_params() {
        let err = BridgeError::MissingTarget {
            type_name: "Math".into(),
            method_name: "add".into(),
            params: vec![NativeType::I32, NativeType::array_of(NativeType::F32)],
        };
        assert_eq!(err.to_string(), "no native target Math::add(i32, f32[])");
    }

    #[test]
    fn test_display_type_mismatch() {
        let err = BridgeError::TypeMismatch {
            expected: NativeType::U8,
            found: NativeType::String,
        };
        assert_eq!(err.to_string(), "type mismatch: expected u8, found string");
    }
}
