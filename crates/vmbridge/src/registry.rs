// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry.
//!
//! Bidirectional mapping between [`NativeType`] tokens and [`WireTypeId`]s.
//!
//! The lifecycle is expressed in types: a [`TypeRegistryBuilder`] accepts
//! registrations and overrides, and [`TypeRegistryBuilder::freeze`] consumes
//! it into an immutable [`TypeRegistry`] that can be shared (`Arc`) between
//! call paths without locking.
//!
//! Built-in scalars are pre-registered with fixed tags. Registered types get
//! tags from [`REGISTERED_TAG_START`] upwards; a tag is never handed out
//! twice, even when an override retires the old one.

use crate::codec::{Codec, ScriptCodec, WireRecord};
use crate::config::{BridgeConfig, PointerWidth};
use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptBuffer;
use crate::type_id::{WireTypeId, REGISTERED_TAG_START};
use crate::value::NativeType;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A registered type: its wire id (never carrying the array flag) and codec.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    id: WireTypeId,
    codec: Codec,
}

impl TypeDescriptor {
    pub fn id(&self) -> WireTypeId {
        self.id
    }

    pub fn native_type(&self) -> &NativeType {
        self.codec.native_type()
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn script(&self) -> &ScriptCodec {
        self.codec.script()
    }
}

/// Read access shared by the builder and the frozen registry.
pub trait TypeLookup {
    /// Descriptor for an id. The array flag is stripped before lookup.
    fn lookup_by_id(&self, id: WireTypeId) -> BridgeResult<&TypeDescriptor>;

    /// Descriptor for a scalar native type. Array tokens resolve to their
    /// element's descriptor.
    fn lookup_by_type(&self, native_type: &NativeType) -> BridgeResult<&TypeDescriptor>;

    /// Wire type id of a native type, array flag included.
    fn type_id_of(&self, native_type: &NativeType) -> BridgeResult<WireTypeId> {
        match native_type {
            NativeType::Array(element) if element.is_array() => {
                Err(BridgeError::ArrayTypeRejected {
                    native_type: native_type.clone(),
                })
            }
            NativeType::Array(element) => Ok(self.lookup_by_type(element)?.id().array()),
            scalar => Ok(self.lookup_by_type(scalar)?.id()),
        }
    }

    /// Native type of a wire type id, array flag included.
    fn native_type_of(&self, id: WireTypeId) -> BridgeResult<NativeType> {
        let element = self.lookup_by_id(id)?.native_type().clone();
        if id.is_array() {
            Ok(NativeType::array_of(element))
        } else {
            Ok(element)
        }
    }
}

/// Storage shared by both lifecycle stages.
#[derive(Debug, Clone, Default)]
struct TypeTable {
    by_type: HashMap<NativeType, u16>,
    by_id: HashMap<u16, TypeDescriptor>,
}

impl TypeTable {
    fn insert(&mut self, tag: u16, codec: Codec) -> WireTypeId {
        let id = WireTypeId::from_tag(tag);
        self.by_type.insert(codec.native_type().clone(), tag);
        self.by_id.insert(tag, TypeDescriptor { id, codec });
        id
    }

    fn remove(&mut self, native_type: &NativeType) -> Option<TypeDescriptor> {
        let tag = self.by_type.remove(native_type)?;
        self.by_id.remove(&tag)
    }

    fn by_id(&self, id: WireTypeId) -> BridgeResult<&TypeDescriptor> {
        self.by_id
            .get(&id.lookup_key())
            .ok_or(BridgeError::UnknownTypeId { id })
    }

    fn by_type(&self, native_type: &NativeType) -> BridgeResult<&TypeDescriptor> {
        let key = native_type.element().unwrap_or(native_type);
        self.by_type
            .get(key)
            .and_then(|tag| self.by_id.get(tag))
            .ok_or_else(|| BridgeError::UnknownNativeType {
                native_type: key.clone(),
            })
    }

    fn contains(&self, native_type: &NativeType) -> bool {
        self.by_type.contains_key(native_type)
    }
}

fn builtin_codec(native_type: NativeType, width: PointerWidth) -> Codec {
    let script = match &native_type {
        NativeType::Void => ScriptCodec::default(),
        NativeType::Char => ScriptCodec::new(
            crate::script::write_snippet(ScriptBuffer::String, crate::script::ARG),
            format!(
                "return string_char_at({}, 1)",
                crate::script::read_snippet(ScriptBuffer::String)
            ),
        ),
        other => match ScriptBuffer::for_builtin(other, width) {
            Some(kind) => ScriptCodec::scalar(kind),
            None => ScriptCodec::default(),
        },
    };
    Codec::builtin(native_type, script)
}

/// Mutable registry, used during startup.
#[derive(Debug)]
pub struct TypeRegistryBuilder {
    table: TypeTable,
    next_tag: u32,
    pointer_width: PointerWidth,
}

impl Default for TypeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistryBuilder {
    /// Builder with the built-ins registered, pointer width of this process.
    pub fn new() -> Self {
        Self::with_pointer_width(PointerWidth::native())
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::with_pointer_width(config.pointer_width)
    }

    pub fn with_pointer_width(pointer_width: PointerWidth) -> Self {
        let mut table = TypeTable::default();
        for (native_type, id) in NativeType::builtins().into_iter().zip(BUILTIN_IDS) {
            table.insert(id.tag(), builtin_codec(native_type, pointer_width));
        }
        Self {
            table,
            next_tag: u32::from(REGISTERED_TAG_START),
            pointer_width,
        }
    }

    pub fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    /// Register a new native type under the next free tag.
    pub fn register(&mut self, codec: Codec) -> BridgeResult<WireTypeId> {
        let native_type = codec.native_type();
        if native_type.is_array() {
            return Err(BridgeError::ArrayTypeRejected {
                native_type: native_type.clone(),
            });
        }
        if self.table.contains(native_type) {
            return Err(BridgeError::DuplicateType {
                native_type: native_type.clone(),
            });
        }

        let tag = u16::try_from(self.next_tag).map_err(|_| BridgeError::InvalidValue {
            reason: "wire type tags exhausted".to_string(),
        })?;
        self.next_tag += 1;

        log::debug!("[registry] registered {} as {}", native_type, tag);
        Ok(self.table.insert(tag, codec))
    }

    /// Register a record type using its derived codec.
    pub fn register_record<T: WireRecord>(&mut self) -> BridgeResult<WireTypeId> {
        self.register(T::codec())
    }

    /// Replace the codec of a registered type.
    ///
    /// The old descriptor is retired and the type gets a new tag, so ids
    /// handed out before the override no longer resolve.
    pub fn override_type(&mut self, codec: Codec) -> BridgeResult<WireTypeId> {
        let native_type = codec.native_type().clone();
        if native_type == NativeType::Void {
            return Err(BridgeError::CannotOverrideVoid);
        }
        if native_type.is_array() {
            return Err(BridgeError::ArrayTypeRejected { native_type });
        }
        let Some(old) = self.table.remove(&native_type) else {
            return Err(BridgeError::NotRegistered { native_type });
        };

        match self.register(codec) {
            Ok(id) => {
                log::debug!(
                    "[registry] overrode {} (tag {} -> {})",
                    native_type,
                    old.id(),
                    id
                );
                Ok(id)
            }
            Err(err) => {
                // Only reachable on tag exhaustion; keep the old descriptor.
                self.table.insert(old.id().tag(), old.codec);
                Err(err)
            }
        }
    }

    pub fn is_registered(&self, native_type: &NativeType) -> bool {
        self.table.contains(native_type)
    }

    pub fn len(&self) -> usize {
        self.table.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.by_id.is_empty()
    }

    /// Consume the builder into an immutable registry.
    pub fn freeze(self) -> TypeRegistry {
        log::info!(
            "[registry] frozen with {} types ({} registered)",
            self.table.by_id.len(),
            self.table
                .by_id
                .keys()
                .filter(|tag| **tag >= REGISTERED_TAG_START)
                .count()
        );
        TypeRegistry {
            table: self.table,
            pointer_width: self.pointer_width,
            dispatch_finalized: AtomicBool::new(false),
        }
    }
}

impl TypeLookup for TypeRegistryBuilder {
    fn lookup_by_id(&self, id: WireTypeId) -> BridgeResult<&TypeDescriptor> {
        self.table.by_id(id)
    }

    fn lookup_by_type(&self, native_type: &NativeType) -> BridgeResult<&TypeDescriptor> {
        self.table.by_type(native_type)
    }
}

const BUILTIN_IDS: [WireTypeId; 15] = [
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
    WireTypeId::CHAR,
    WireTypeId::INT_PTR,
];

/// Frozen registry. Immutable; share it with `Arc`.
#[derive(Debug)]
pub struct TypeRegistry {
    table: TypeTable,
    pointer_width: PointerWidth,
    dispatch_finalized: AtomicBool,
}

impl TypeRegistry {
    pub fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    pub fn is_registered(&self, native_type: &NativeType) -> bool {
        self.table.contains(native_type)
    }

    pub fn is_id_registered(&self, id: WireTypeId) -> bool {
        self.table.by_id.contains_key(&id.lookup_key())
    }

    pub fn len(&self) -> usize {
        self.table.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.by_id.is_empty()
    }

    /// All descriptors, in tag order.
    pub fn descriptors(&self) -> Vec<&TypeDescriptor> {
        let mut descriptors: Vec<_> = self.table.by_id.values().collect();
        descriptors.sort_by_key(|d| d.id());
        descriptors
    }

    /// Claim the one-time dispatch emission. Returns `false` if it was
    /// already claimed.
    pub(crate) fn claim_dispatch(&self) -> bool {
        !self.dispatch_finalized.swap(true, Ordering::AcqRel)
    }

    /// Give back a claim whose emission failed.
    pub(crate) fn release_dispatch(&self) {
        self.dispatch_finalized.store(false, Ordering::Release);
    }

    pub fn is_dispatch_finalized(&self) -> bool {
        self.dispatch_finalized.load(Ordering::Acquire)
    }
}

impl TypeLookup for TypeRegistry {
    fn lookup_by_id(&self, id: WireTypeId) -> BridgeResult<&TypeDescriptor> {
        self.table.by_id(id)
    }

    fn lookup_by_type(&self, native_type: &NativeType) -> BridgeResult<&TypeDescriptor> {
        self.table.by_type(native_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_id::ARRAY_FLAG;

    fn opaque_codec(name: &'static str) -> Codec {
        Codec::new(
            NativeType::named(name),
            |_, _| Ok(()),
            move |_| Ok(crate::WireValue::Record(NativeType::named(name), Vec::new())),
            ScriptCodec::new("", "return {}"),
        )
    }

    #[test]
    fn test_builtins_have_fixed_tags() {
        let registry = TypeRegistryBuilder::new().freeze();
        assert_eq!(registry.type_id_of(&NativeType::Void), Ok(WireTypeId::VOID));
        assert_eq!(registry.type_id_of(&NativeType::U32), Ok(WireTypeId::U32));
        assert_eq!(registry.type_id_of(&NativeType::String), Ok(WireTypeId::STRING));
        assert_eq!(registry.type_id_of(&NativeType::Char), Ok(WireTypeId::CHAR));
        assert_eq!(registry.type_id_of(&NativeType::IntPtr), Ok(WireTypeId::INT_PTR));
        assert_eq!(registry.len(), 15);
    }

    #[test]
    fn test_first_registered_type_gets_tag_1000() {
        let mut builder = TypeRegistryBuilder::new();
        let id = builder.register(opaque_codec("Vec2")).expect("register");
        assert_eq!(id.raw(), 1000);

        let registry = builder.freeze();
        let descriptor = registry.lookup_by_id(id).expect("lookup");
        assert_eq!(descriptor.native_type(), &NativeType::named("Vec2"));

        let array_id = WireTypeId::from_raw(1000 | ARRAY_FLAG);
        assert_eq!(
            registry.native_type_of(array_id),
            Ok(NativeType::array_of(NativeType::named("Vec2")))
        );
        assert_eq!(
            registry.lookup_by_id(array_id).expect("array lookup").id(),
            id
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut builder = TypeRegistryBuilder::new();
        builder.register(opaque_codec("Vec2")).expect("first");
        assert_eq!(
            builder.register(opaque_codec("Vec2")),
            Err(BridgeError::DuplicateType {
                native_type: NativeType::named("Vec2")
            })
        );
        assert!(matches!(
            builder.register(Codec::builtin(NativeType::U8, ScriptCodec::default())),
            Err(BridgeError::DuplicateType { .. })
        ));
    }

    #[test]
    fn test_array_registration_rejected() {
        let mut builder = TypeRegistryBuilder::new();
        let codec = Codec::builtin(NativeType::array_of(NativeType::U8), ScriptCodec::default());
        assert!(matches!(
            builder.register(codec.clone()),
            Err(BridgeError::ArrayTypeRejected { .. })
        ));
        assert!(matches!(
            builder.override_type(codec),
            Err(BridgeError::ArrayTypeRejected { .. })
        ));
    }

    #[test]
    fn test_override_assigns_new_tag() {
        let mut builder = TypeRegistryBuilder::new();
        let first = builder.register(opaque_codec("Vec2")).expect("register");
        let second = builder.register(opaque_codec("Vec3")).expect("register");
        let replaced = builder.override_type(opaque_codec("Vec2")).expect("override");

        assert_eq!(second.raw(), 1001);
        assert_eq!(replaced.raw(), 1002);
        assert!(builder.lookup_by_id(first).is_err());
        assert_eq!(builder.type_id_of(&NativeType::named("Vec2")), Ok(replaced));
    }

    #[test]
    fn test_override_builtin_moves_it_out_of_builtin_range() {
        let mut builder = TypeRegistryBuilder::new();
        let id = builder
            .override_type(Codec::builtin(NativeType::U16, ScriptCodec::default()))
            .expect("override");
        assert_eq!(id.raw(), 1000);
        assert!(matches!(
            builder.lookup_by_id(WireTypeId::U16),
            Err(BridgeError::UnknownTypeId { .. })
        ));
    }

    #[test]
    fn test_override_errors() {
        let mut builder = TypeRegistryBuilder::new();
        assert_eq!(
            builder.override_type(opaque_codec("Missing")),
            Err(BridgeError::NotRegistered {
                native_type: NativeType::named("Missing")
            })
        );
        assert_eq!(
            builder.override_type(Codec::builtin(NativeType::Void, ScriptCodec::default())),
            Err(BridgeError::CannotOverrideVoid)
        );
    }

    #[test]
    fn test_unknown_lookups_name_the_key() {
        let registry = TypeRegistryBuilder::new().freeze();
        assert_eq!(
            registry.lookup_by_id(WireTypeId::from_raw(4242)).unwrap_err(),
            BridgeError::UnknownTypeId {
                id: WireTypeId::from_raw(4242)
            }
        );
        assert_eq!(
            registry
                .type_id_of(&NativeType::array_of(NativeType::named("Nope")))
                .unwrap_err(),
            BridgeError::UnknownNativeType {
                native_type: NativeType::named("Nope")
            }
        );
    }

    #[test]
    fn test_nested_array_has_no_id() {
        let registry = TypeRegistryBuilder::new().freeze();
        let nested = NativeType::array_of(NativeType::array_of(NativeType::I32));
        assert!(matches!(
            registry.type_id_of(&nested),
            Err(BridgeError::ArrayTypeRejected { .. })
        ));
    }

    #[test]
    fn test_int_ptr_script_follows_pointer_width() {
        let narrow = TypeRegistryBuilder::with_pointer_width(PointerWidth::W32).freeze();
        let wide = TypeRegistryBuilder::with_pointer_width(PointerWidth::W64).freeze();
        let script = |r: &TypeRegistry| {
            r.lookup_by_type(&NativeType::IntPtr)
                .expect("isize")
                .script()
                .encode
                .clone()
        };
        assert!(script(&narrow).contains("buffer_s32"));
        assert!(script(&wide).contains("buffer_u64"));
    }

    #[test]
    fn test_descriptors_in_tag_order() {
        let mut builder = TypeRegistryBuilder::new();
        builder.register(opaque_codec("B")).expect("register");
        builder.register(opaque_codec("A")).expect("register");
        let registry = builder.freeze();
        let tags: Vec<u32> = registry.descriptors().iter().map(|d| d.id().raw()).collect();
        let mut sorted = tags.clone();
        sorted.sort_unstable();
        assert_eq!(tags, sorted);
        assert_eq!(tags.last(), Some(&1001));
    }

    #[test]
    fn test_claim_dispatch_once() {
        let registry = TypeRegistryBuilder::new().freeze();
        assert!(!registry.is_dispatch_finalized());
        assert!(registry.claim_dispatch());
        assert!(!registry.claim_dispatch());
        assert!(registry.is_dispatch_finalized());
        registry.release_dispatch();
        assert!(registry.claim_dispatch());
    }
}
