// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire reader.
//!
//! A reader is either unbound or bound to one length-prefixed buffer. Every
//! read is checked against the *declared* length, never against whatever
//! memory follows it.

use crate::config::PointerWidth;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{TypeLookup, TypeRegistry};
use crate::type_id::{WireTypeId, LENGTH_PREFIX_SIZE};
use crate::value::{Half, NativeType, NativeValue, WireValue};

/// Generate little-endian read methods for fixed-width scalars.
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> BridgeResult<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.take($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

#[derive(Debug, Clone, Copy)]
enum ReaderState<'b> {
    Unbound,
    Bound {
        buffer: &'b [u8],
        offset: usize,
        bound: usize,
    },
}

/// Bounds-checked reader bound to a registry.
pub struct WireReader<'r, 'b> {
    registry: &'r TypeRegistry,
    state: ReaderState<'b>,
}

impl<'r, 'b> WireReader<'r, 'b> {
    /// Unbound reader; bind it with [`reset`](Self::reset).
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            state: ReaderState::Unbound,
        }
    }

    /// Reader bound to `buffer`.
    pub fn bind(registry: &'r TypeRegistry, buffer: &'b [u8]) -> BridgeResult<Self> {
        let mut reader = Self::new(registry);
        reader.reset(buffer)?;
        Ok(reader)
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    /// Bind to `buffer`: the length prefix becomes the read bound and the
    /// cursor moves past it. On error the reader is left unbound.
    pub fn reset(&mut self, buffer: &'b [u8]) -> BridgeResult<()> {
        self.state = ReaderState::Unbound;

        if buffer.len() < LENGTH_PREFIX_SIZE {
            return Err(BridgeError::OutOfRange {
                offset: 0,
                bound: buffer.len(),
                reason: "buffer shorter than its length prefix",
            });
        }
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&buffer[..LENGTH_PREFIX_SIZE]);
        let declared = u32::from_le_bytes(prefix) as usize;

        if declared < LENGTH_PREFIX_SIZE {
            return Err(BridgeError::OutOfRange {
                offset: 0,
                bound: declared,
                reason: "declared length shorter than its prefix",
            });
        }
        if declared > buffer.len() {
            return Err(BridgeError::OutOfRange {
                offset: 0,
                bound: declared,
                reason: "declared length exceeds the buffer",
            });
        }

        self.state = ReaderState::Bound {
            buffer,
            offset: LENGTH_PREFIX_SIZE,
            bound: declared,
        };
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, ReaderState::Bound { .. })
    }

    pub fn offset(&self) -> usize {
        match self.state {
            ReaderState::Bound { offset, .. } => offset,
            ReaderState::Unbound => 0,
        }
    }

    /// Declared length of the bound buffer.
    pub fn bound(&self) -> usize {
        match self.state {
            ReaderState::Bound { bound, .. } => bound,
            ReaderState::Unbound => 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.bound().saturating_sub(self.offset())
    }

    fn take(&mut self, len: usize) -> BridgeResult<&'b [u8]> {
        match &mut self.state {
            ReaderState::Unbound => Err(BridgeError::OutOfRange {
                offset: 0,
                bound: 0,
                reason: "reader is not bound to a buffer",
            }),
            ReaderState::Bound {
                buffer,
                offset,
                bound,
            } => {
                let buffer: &'b [u8] = *buffer;
                let end = offset
                    .checked_add(len)
                    .filter(|end| *end <= *bound)
                    .ok_or(BridgeError::OutOfRange {
                        offset: *offset,
                        bound: *bound,
                        reason: "unexpected end of buffer",
                    })?;
                let bytes = &buffer[*offset..end];
                *offset = end;
                Ok(bytes)
            }
        }
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    pub fn read_f16(&mut self) -> BridgeResult<Half> {
        self.read_u16().map(Half::from_bits)
    }

    /// Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> BridgeResult<bool> {
        self.read_u8().map(|b| b != 0)
    }

    pub fn read_type_id(&mut self) -> BridgeResult<WireTypeId> {
        self.read_u32().map(WireTypeId::from_raw)
    }

    /// Pointer-sized integer at the registry's pointer width.
    pub fn read_int_ptr(&mut self) -> BridgeResult<i64> {
        match self.registry.pointer_width() {
            PointerWidth::W64 => self.read_i64(),
            PointerWidth::W32 => self.read_i32().map(i64::from),
        }
    }

    /// NUL-terminated UTF-8 string. The terminator must lie before the bound.
    pub fn read_string(&mut self) -> BridgeResult<String> {
        let (buffer, start, bound) = match self.state {
            ReaderState::Bound {
                buffer,
                offset,
                bound,
            } => (buffer, offset, bound),
            ReaderState::Unbound => {
                return Err(BridgeError::OutOfRange {
                    offset: 0,
                    bound: 0,
                    reason: "reader is not bound to a buffer",
                })
            }
        };

        let window = buffer.get(start..bound).unwrap_or(&[]);
        let Some(len) = window.iter().position(|&b| b == 0) else {
            return Err(BridgeError::OutOfRange {
                offset: start,
                bound,
                reason: "unterminated string",
            });
        };
        let text = std::str::from_utf8(&window[..len])
            .map_err(|_| BridgeError::InvalidUtf8 { offset: start })?
            .to_string();
        self.take(len + 1)?;
        Ok(text)
    }

    /// First character of a string.
    pub fn read_char(&mut self) -> BridgeResult<char> {
        let text = self.read_string()?;
        text.chars().next().ok_or_else(|| BridgeError::InvalidValue {
            reason: "empty string cannot be decoded as char".to_string(),
        })
    }

    /// Read a built-in scalar with its fixed encoding, bypassing the registry.
    pub fn read_builtin(&mut self, native_type: &NativeType) -> BridgeResult<WireValue> {
        Ok(match native_type {
            NativeType::Void => WireValue::Void,
            NativeType::U8 => WireValue::U8(self.read_u8()?),
            NativeType::I8 => WireValue::I8(self.read_i8()?),
            NativeType::U16 => WireValue::U16(self.read_u16()?),
            NativeType::I16 => WireValue::I16(self.read_i16()?),
            NativeType::U32 => WireValue::U32(self.read_u32()?),
            NativeType::I32 => WireValue::I32(self.read_i32()?),
            NativeType::I64 => WireValue::I64(self.read_i64()?),
            NativeType::F16 => WireValue::F16(self.read_f16()?),
            NativeType::F32 => WireValue::F32(self.read_f32()?),
            NativeType::F64 => WireValue::F64(self.read_f64()?),
            NativeType::Bool => WireValue::Bool(self.read_bool()?),
            NativeType::String => WireValue::String(self.read_string()?),
            NativeType::Char => WireValue::Char(self.read_char()?),
            NativeType::IntPtr => WireValue::IntPtr(self.read_int_ptr()?),
            NativeType::Named(_) | NativeType::Array(_) => {
                return Err(BridgeError::InvalidValue {
                    reason: format!("{} has no built-in encoding", native_type),
                })
            }
        })
    }

    /// Read a value of type `id`. Mirrors [`crate::WireWriter::write`].
    pub fn read(&mut self, id: WireTypeId) -> BridgeResult<WireValue> {
        let registry = self.registry;
        let descriptor = registry.lookup_by_id(id)?;

        if id.is_array() {
            let items = self.read_array(id.element())?;
            return Ok(WireValue::Array(descriptor.native_type().clone(), items));
        }
        descriptor.codec().decode(self)
    }

    pub fn read_typed<T: NativeValue>(&mut self) -> BridgeResult<T> {
        let id = self.registry.type_id_of(&T::native_type())?;
        T::from_wire(self.read(id)?)
    }

    /// Count then elements of type `element`.
    ///
    /// Every element occupies at least one byte, so a count larger than the
    /// remaining bytes, or an element that consumes nothing, is rejected
    /// before anything is allocated for it.
    pub fn read_array(&mut self, element: WireTypeId) -> BridgeResult<Vec<WireValue>> {
        let offset = self.offset();
        let count = self.read_i32()?;
        let count = usize::try_from(count).map_err(|_| BridgeError::InvalidValue {
            reason: format!("negative array count {} at offset {}", count, offset),
        })?;
        if count > self.remaining() {
            return Err(BridgeError::OutOfRange {
                offset,
                bound: self.bound(),
                reason: "array count exceeds the remaining bytes",
            });
        }

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let start = self.offset();
            items.push(self.read(element.element())?);
            if self.offset() == start {
                return Err(BridgeError::OutOfRange {
                    offset: start,
                    bound: self.bound(),
                    reason: "array element consumed no bytes",
                });
            }
        }
        Ok(items)
    }
}
