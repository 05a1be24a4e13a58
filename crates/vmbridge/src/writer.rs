// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire writer.
//!
//! Appends values to a growable buffer. The length prefix is only added by
//! [`WireWriter::finalize`], which returns an independent copy so the writer
//! can keep going or be [`reset`](WireWriter::reset) and reused.

use crate::config::PointerWidth;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{TypeLookup, TypeRegistry};
use crate::type_id::{WireTypeId, LENGTH_PREFIX_SIZE};
use crate::value::{Half, NativeType, NativeValue, WireValue};

/// Generate little-endian append methods for fixed-width scalars.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Growable writer bound to a registry.
pub struct WireWriter<'r> {
    registry: &'r TypeRegistry,
    buffer: Vec<u8>,
}

impl<'r> WireWriter<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            buffer: Vec::new(),
        }
    }

    pub fn with_capacity(registry: &'r TypeRegistry, capacity: usize) -> Self {
        Self {
            registry,
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    pub fn write_f16(&mut self, value: Half) {
        self.write_u16(value.to_bits());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_type_id(&mut self, id: WireTypeId) {
        self.write_u32(id.raw());
    }

    /// Pointer-sized integer at the registry's pointer width.
    pub fn write_int_ptr(&mut self, value: i64) -> BridgeResult<()> {
        match self.registry.pointer_width() {
            PointerWidth::W64 => self.write_i64(value),
            PointerWidth::W32 => {
                let narrow = i32::try_from(value).map_err(|_| BridgeError::InvalidValue {
                    reason: format!("pointer value {:#x} does not fit in 32 bits", value),
                })?;
                self.write_i32(narrow);
            }
        }
        Ok(())
    }

    /// UTF-8 bytes followed by a NUL terminator.
    pub fn write_string(&mut self, value: &str) -> BridgeResult<()> {
        if value.as_bytes().contains(&0) {
            return Err(BridgeError::InvalidValue {
                reason: "string contains an interior NUL byte".to_string(),
            });
        }
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(0);
        Ok(())
    }

    /// A `char` travels as a one-character string.
    pub fn write_char(&mut self, value: char) -> BridgeResult<()> {
        let mut utf8 = [0u8; 4];
        self.write_string(value.encode_utf8(&mut utf8))
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write a built-in scalar with its fixed encoding, bypassing the
    /// registry. `value` must be of type `native_type`.
    pub fn write_builtin_as(&mut self, native_type: &NativeType, value: &WireValue) -> BridgeResult<()> {
        match (native_type, value) {
            (NativeType::Void, WireValue::Void) => {}
            (NativeType::U8, WireValue::U8(v)) => self.write_u8(*v),
            (NativeType::I8, WireValue::I8(v)) => self.write_i8(*v),
            (NativeType::U16, WireValue::U16(v)) => self.write_u16(*v),
            (NativeType::I16, WireValue::I16(v)) => self.write_i16(*v),
            (NativeType::U32, WireValue::U32(v)) => self.write_u32(*v),
            (NativeType::I32, WireValue::I32(v)) => self.write_i32(*v),
            (NativeType::I64, WireValue::I64(v)) => self.write_i64(*v),
            (NativeType::F16, WireValue::F16(v)) => self.write_f16(*v),
            (NativeType::F32, WireValue::F32(v)) => self.write_f32(*v),
            (NativeType::F64, WireValue::F64(v)) => self.write_f64(*v),
            (NativeType::Bool, WireValue::Bool(v)) => self.write_bool(*v),
            (NativeType::String, WireValue::String(v)) => self.write_string(v)?,
            (NativeType::Char, WireValue::Char(v)) => self.write_char(*v)?,
            (NativeType::IntPtr, WireValue::IntPtr(v)) => self.write_int_ptr(*v)?,
            (NativeType::Named(_) | NativeType::Array(_), _) => {
                return Err(BridgeError::InvalidValue {
                    reason: format!("{} has no built-in encoding", native_type),
                })
            }
            (expected, found) => {
                return Err(BridgeError::TypeMismatch {
                    expected: expected.clone(),
                    found: found.native_type(),
                })
            }
        }
        Ok(())
    }

    /// Write `value` as type `id`.
    ///
    /// Array ids write an `i32` count followed by each element; scalar ids
    /// check the value against the registered native type, then run the
    /// registered encoder. On error the content is left as it was before the
    /// call.
    pub fn write(&mut self, id: WireTypeId, value: &WireValue) -> BridgeResult<()> {
        let start = self.buffer.len();
        self.write_inner(id, value)
            .inspect_err(|_| self.buffer.truncate(start))
    }

    fn write_inner(&mut self, id: WireTypeId, value: &WireValue) -> BridgeResult<()> {
        let registry = self.registry;
        let descriptor = registry.lookup_by_id(id)?;

        if id.is_array() {
            let element = descriptor.native_type();
            let items = match value {
                WireValue::Array(ty, items) if ty == element => items,
                other => {
                    return Err(BridgeError::TypeMismatch {
                        expected: NativeType::array_of(element.clone()),
                        found: other.native_type(),
                    })
                }
            };
            return self.write_array_inner(id.element(), items);
        }

        let found = value.native_type();
        if &found != descriptor.native_type() {
            return Err(BridgeError::TypeMismatch {
                expected: descriptor.native_type().clone(),
                found,
            });
        }
        descriptor.codec().encode(self, value)
    }

    /// Write a value of any registered type, deriving its id from the value.
    pub fn write_value(&mut self, value: &WireValue) -> BridgeResult<()> {
        let id = self.registry.type_id_of(&value.native_type())?;
        self.write(id, value)
    }

    pub fn write_typed<T: NativeValue>(&mut self, value: T) -> BridgeResult<()> {
        let id = self.registry.type_id_of(&T::native_type())?;
        self.write(id, &value.into_wire())
    }

    /// Count then elements of type `element`. Elements must encode to at
    /// least one byte each. On error the content is left as it was.
    pub fn write_array(&mut self, element: WireTypeId, items: &[WireValue]) -> BridgeResult<()> {
        let start = self.buffer.len();
        self.write_array_inner(element.element(), items)
            .inspect_err(|_| self.buffer.truncate(start))
    }

    fn write_array_inner(&mut self, element: WireTypeId, items: &[WireValue]) -> BridgeResult<()> {
        let count = i32::try_from(items.len()).map_err(|_| BridgeError::InvalidValue {
            reason: format!("array of {} items exceeds the wire count", items.len()),
        })?;
        self.write_i32(count);
        for item in items {
            let before = self.buffer.len();
            self.write_inner(element, item)?;
            if self.buffer.len() == before {
                return Err(BridgeError::InvalidValue {
                    reason: format!("array element of type {} encodes to no bytes", item.native_type()),
                });
            }
        }
        Ok(())
    }

    /// Content written so far, without the length prefix.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Length-prefixed copy of the content. The writer is unaffected.
    pub fn finalize(&self) -> BridgeResult<Vec<u8>> {
        let total = self.buffer.len() + LENGTH_PREFIX_SIZE;
        let prefix = u32::try_from(total).map_err(|_| BridgeError::InvalidValue {
            reason: format!("buffer of {} bytes exceeds the length prefix", total),
        })?;
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&prefix.to_le_bytes());
        out.extend_from_slice(&self.buffer);
        Ok(out)
    }

    /// Clear the content, keeping the allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistryBuilder;

    #[test]
    fn test_u32_scenario_bytes() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        writer
            .write(WireTypeId::U32, &WireValue::U32(0xDEAD_BEEF))
            .expect("write u32");
        assert_eq!(
            writer.finalize().expect("finalize"),
            vec![0x08, 0x00, 0x00, 0x00, 0xEF, 0xBE, 0xAD, 0xDE]
        );
    }

    #[test]
    fn test_finalize_is_independent_copy() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        writer.write_u16(7);
        let first = writer.finalize().expect("finalize");
        writer.write_u8(1);
        assert_eq!(first.len(), 6);
        assert_eq!(writer.len(), 3);
        assert_eq!(writer.finalize().expect("finalize")[0], 7);
    }

    #[test]
    fn test_empty_buffer_prefix() {
        let registry = TypeRegistryBuilder::new().freeze();
        let writer = WireWriter::new(&registry);
        assert_eq!(writer.finalize().expect("finalize"), vec![4, 0, 0, 0]);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::with_capacity(&registry, 128);
        writer.write_f64(1.5);
        writer.reset();
        assert!(writer.is_empty());
        assert!(writer.buffer.capacity() >= 128);
    }

    #[test]
    fn test_string_is_nul_terminated() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        writer.write_string("hé").expect("write string");
        assert_eq!(writer.as_bytes(), &[b'h', 0xC3, 0xA9, 0]);
        assert!(matches!(
            writer.write_string("a\0b"),
            Err(BridgeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        assert_eq!(
            writer.write(WireTypeId::U8, &WireValue::from("nope")),
            Err(BridgeError::TypeMismatch {
                expected: NativeType::U8,
                found: NativeType::String,
            })
        );
        assert!(matches!(
            writer.write(WireTypeId::I32.array(), &WireValue::I32(3)),
            Err(BridgeError::TypeMismatch { .. })
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_array_encoding() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        writer.write_typed(vec![1u8, 2, 3]).expect("write array");
        assert_eq!(writer.as_bytes(), &[3, 0, 0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_int_ptr_width() {
        let narrow = TypeRegistryBuilder::with_pointer_width(PointerWidth::W32).freeze();
        let mut writer = WireWriter::new(&narrow);
        writer.write_int_ptr(-2).expect("fits");
        assert_eq!(writer.as_bytes(), &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(
            writer.write_int_ptr(i64::from(i32::MAX) + 1),
            Err(BridgeError::InvalidValue { .. })
        ));

        let wide = TypeRegistryBuilder::with_pointer_width(PointerWidth::W64).freeze();
        let mut writer = WireWriter::new(&wide);
        writer.write_int_ptr(i64::MIN).expect("fits");
        assert_eq!(writer.len(), 8);
    }

    #[test]
    fn test_failed_array_write_leaves_content_unchanged() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        writer.write_u8(9);
        let items = WireValue::Array(
            NativeType::String,
            vec![WireValue::from("ok"), WireValue::from("b\0ad")],
        );
        assert!(matches!(
            writer.write(WireTypeId::STRING.array(), &items),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert_eq!(writer.as_bytes(), &[9]);
        assert_eq!(writer.finalize().expect("finalize"), vec![5, 0, 0, 0, 9]);
    }

    #[test]
    fn test_zero_width_elements_rejected() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        let voids = WireValue::Array(NativeType::Void, vec![WireValue::Void; 3]);
        assert!(matches!(
            writer.write(WireTypeId::VOID.array(), &voids),
            Err(BridgeError::InvalidValue { .. })
        ));
        assert!(writer.is_empty());

        let empty = WireValue::Array(NativeType::Void, Vec::new());
        writer.write(WireTypeId::VOID.array(), &empty).expect("empty array");
        assert_eq!(writer.as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_id() {
        let registry = TypeRegistryBuilder::new().freeze();
        let mut writer = WireWriter::new(&registry);
        assert!(matches!(
            writer.write(WireTypeId::from_raw(1234), &WireValue::Void),
            Err(BridgeError::UnknownTypeId { .. })
        ));
    }
}
