// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec descriptors.
//!
//! A [`Codec`] bundles both halves of a type's wire mapping: the native
//! encode/decode functions and the script snippets that do the same work in
//! the scripting runtime. Registration takes a whole `Codec`, so one half
//! can never be registered without the other.

use crate::error::BridgeResult;
use crate::reader::WireReader;
use crate::script::{self, ScriptBuffer};
use crate::value::{NativeType, NativeValue, WireValue};
use crate::writer::WireWriter;
use std::fmt;
use std::sync::Arc;

/// Native encoder: appends a value to a writer.
pub type EncodeFn = Arc<dyn Fn(&mut WireWriter<'_>, &WireValue) -> BridgeResult<()> + Send + Sync>;

/// Native decoder: reads one value from a reader.
pub type DecodeFn = Arc<dyn Fn(&mut WireReader<'_, '_>) -> BridgeResult<WireValue> + Send + Sync>;

/// Script-side half of a codec.
///
/// `encode` runs with `argBuffer` (destination buffer) and `arg` (value) in
/// scope; `decode` runs with `resultBuffer` in scope and must `return` the
/// decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptCodec {
    pub encode: String,
    pub decode: String,
}

impl ScriptCodec {
    pub fn new(encode: impl Into<String>, decode: impl Into<String>) -> Self {
        Self {
            encode: encode.into(),
            decode: decode.into(),
        }
    }

    /// Snippets for a value stored in a single script buffer slot.
    pub fn scalar(kind: ScriptBuffer) -> Self {
        Self {
            encode: script::write_snippet(kind, script::ARG),
            decode: format!("return {}", script::read_snippet(kind)),
        }
    }

    /// Snippets for a record whose fields are written in order.
    pub fn record(fields: &[(&str, ScriptBuffer)]) -> Self {
        let encode = fields
            .iter()
            .map(|(name, kind)| script::write_snippet(*kind, &format!("{}.{}", script::ARG, name)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut decode = String::from("var result = {}\n");
        for (name, kind) in fields {
            decode.push_str(&format!("result.{} = {}\n", name, script::read_snippet(*kind)));
        }
        decode.push_str("return result");

        Self { encode, decode }
    }
}

/// Native and script codec for one native type.
#[derive(Clone)]
pub struct Codec {
    native_type: NativeType,
    encode: EncodeFn,
    decode: DecodeFn,
    script: ScriptCodec,
}

impl Codec {
    pub fn new<E, D>(native_type: NativeType, encode: E, decode: D, script: ScriptCodec) -> Self
    where
        E: Fn(&mut WireWriter<'_>, &WireValue) -> BridgeResult<()> + Send + Sync + 'static,
        D: Fn(&mut WireReader<'_, '_>) -> BridgeResult<WireValue> + Send + Sync + 'static,
    {
        Self {
            native_type,
            encode: Arc::new(encode),
            decode: Arc::new(decode),
            script,
        }
    }

    /// Codec using the fixed built-in encoding of a scalar native type.
    ///
    /// Pointer-sized integers follow the pointer width of the registry the
    /// writer or reader is bound to.
    pub fn builtin(native_type: NativeType, script: ScriptCodec) -> Self {
        let encode_type = native_type.clone();
        let decode_type = native_type.clone();
        Self::new(
            native_type,
            move |writer, value| writer.write_builtin_as(&encode_type, value),
            move |reader| reader.read_builtin(&decode_type),
            script,
        )
    }

    pub fn native_type(&self) -> &NativeType {
        &self.native_type
    }

    pub fn script(&self) -> &ScriptCodec {
        &self.script
    }

    pub fn encode(&self, writer: &mut WireWriter<'_>, value: &WireValue) -> BridgeResult<()> {
        (self.encode)(writer, value)
    }

    pub fn decode(&self, reader: &mut WireReader<'_, '_>) -> BridgeResult<WireValue> {
        (self.decode)(reader)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("native_type", &self.native_type)
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

/// A record type whose codec is derived from its field list.
///
/// Implemented by `#[derive(WireRecord)]`.
pub trait WireRecord: NativeValue {
    fn codec() -> Codec;
}
