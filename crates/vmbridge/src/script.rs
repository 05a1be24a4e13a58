// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Script-side code generation.
//!
//! The bridge never executes script source. It hands generated functions to
//! a [`ScriptHost`] collaborator, which defines them in the scripting
//! runtime:
//!
//! - one `<prefix>_write_<type>` / `<prefix>_read_<type>` pair per
//!   registered type, wrapping the type's script snippets,
//! - the `<prefix>_write` / `<prefix>_read` dispatchers, switching on the
//!   wire type id (plus the array branch),
//! - the shared `<prefix>_call` entry function that marshals a call,
//!   invokes the native entry point and retrieves the result.
//!
//! Dispatchers can only be emitted once per frozen registry, after which no
//! type can be added anyway.

use crate::bridge::entry;
use crate::config::{BridgeConfig, PointerWidth};
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{TypeDescriptor, TypeRegistry};
use crate::type_id::{ARRAY_FLAG, REGISTERED_TAG_START};
use crate::value::NativeType;

/// Append one formatted line of script source.
macro_rules! emit {
    ($src:ident, $($arg:tt)*) => {{
        $src.push_str(&format!($($arg)*));
        $src.push('\n');
    }};
}

/// Name of the destination buffer inside encode snippets.
pub const ARG_BUFFER: &str = "argBuffer";
/// Name of the value inside encode snippets.
pub const ARG: &str = "arg";
/// Name of the source buffer inside decode snippets.
pub const RESULT_BUFFER: &str = "resultBuffer";

/// Buffer element kinds of the scripting runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptBuffer {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    F16,
    F32,
    F64,
    Bool,
    String,
}

impl ScriptBuffer {
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "buffer_u8",
            Self::S8 => "buffer_s8",
            Self::U16 => "buffer_u16",
            Self::S16 => "buffer_s16",
            Self::U32 => "buffer_u32",
            Self::S32 => "buffer_s32",
            Self::U64 => "buffer_u64",
            Self::F16 => "buffer_f16",
            Self::F32 => "buffer_f32",
            Self::F64 => "buffer_f64",
            Self::Bool => "buffer_bool",
            Self::String => "buffer_string",
        }
    }

    /// Buffer kind carrying a built-in scalar.
    ///
    /// The runtime has no signed 64-bit kind; `i64` travels as `buffer_u64`,
    /// which preserves the bit pattern.
    pub fn for_builtin(native_type: &NativeType, width: PointerWidth) -> Option<Self> {
        Some(match native_type {
            NativeType::U8 => Self::U8,
            NativeType::I8 => Self::S8,
            NativeType::U16 => Self::U16,
            NativeType::I16 => Self::S16,
            NativeType::U32 => Self::U32,
            NativeType::I32 => Self::S32,
            NativeType::I64 => Self::U64,
            NativeType::F16 => Self::F16,
            NativeType::F32 => Self::F32,
            NativeType::F64 => Self::F64,
            NativeType::Bool => Self::Bool,
            NativeType::String | NativeType::Char => Self::String,
            NativeType::IntPtr => match width {
                PointerWidth::W32 => Self::S32,
                PointerWidth::W64 => Self::U64,
            },
            _ => return None,
        })
    }
}

/// `buffer_write(argBuffer, <kind>, <value>)`
pub fn write_snippet(kind: ScriptBuffer, value: &str) -> String {
    format!("buffer_write({}, {}, {})", ARG_BUFFER, kind.name(), value)
}

/// `buffer_read(resultBuffer, <kind>)`
pub fn read_snippet(kind: ScriptBuffer) -> String {
    format!("buffer_read({}, {})", RESULT_BUFFER, kind.name())
}

/// Snippet writing an array of `element` values held in `value`.
pub fn write_array_snippet(names: &ScriptNames, element_id: &str, value: &str) -> String {
    format!(
        "{}({}, {} | {}, {})",
        names.write_dispatch(),
        ARG_BUFFER,
        element_id,
        ARRAY_FLAG,
        value
    )
}

/// Snippet reading an array of `element` values.
pub fn read_array_snippet(names: &ScriptNames, element_id: &str) -> String {
    format!(
        "{}({}, {} | {})",
        names.read_dispatch(),
        RESULT_BUFFER,
        element_id,
        ARRAY_FLAG
    )
}

/// Snippet writing `value` through the write dispatcher.
pub fn write_dispatch_call(names: &ScriptNames, type_id: &str, value: &str) -> String {
    format!("{}({}, {}, {})", names.write_dispatch(), ARG_BUFFER, type_id, value)
}

/// Snippet reading one value through the read dispatcher.
pub fn read_dispatch_call(names: &ScriptNames, type_id: &str) -> String {
    format!("{}({}, {})", names.read_dispatch(), RESULT_BUFFER, type_id)
}

/// Collaborator that defines script functions in the runtime.
pub trait ScriptHost {
    fn define_function(&mut self, name: &str, source: &str) -> Result<(), String>;
}

/// [`ScriptHost`] keeping the generated functions in emission order.
#[derive(Debug, Default, Clone)]
pub struct ScriptCollector {
    functions: Vec<(String, String)>,
}

impl ScriptCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions(&self) -> &[(String, String)] {
        &self.functions
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.functions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, source)| source.as_str())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl ScriptHost for ScriptCollector {
    fn define_function(&mut self, name: &str, source: &str) -> Result<(), String> {
        if self.source(name).is_some() {
            return Err(format!("function {} is already defined", name));
        }
        self.functions.push((name.to_string(), source.to_string()));
        Ok(())
    }
}

/// Names of the generated script functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNames {
    prefix: String,
}

impl ScriptNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.function_prefix.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn write_type(&self, descriptor: &TypeDescriptor) -> String {
        format!("{}_write_{}", self.prefix, type_suffix(descriptor))
    }

    pub fn read_type(&self, descriptor: &TypeDescriptor) -> String {
        format!("{}_read_{}", self.prefix, type_suffix(descriptor))
    }

    pub fn write_dispatch(&self) -> String {
        format!("{}_write", self.prefix)
    }

    pub fn read_dispatch(&self) -> String {
        format!("{}_read", self.prefix)
    }

    pub fn call(&self) -> String {
        format!("{}_call", self.prefix)
    }
}

// Built-in names are distinct by construction; registered names may collide
// once sanitized, so they carry their tag.
fn type_suffix(descriptor: &TypeDescriptor) -> String {
    let sanitized: String = descriptor
        .native_type()
        .to_string()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let tag = descriptor.id().tag();
    if tag >= REGISTERED_TAG_START {
        format!("{}_{}", sanitized, tag)
    } else {
        sanitized
    }
}

/// Builds the source of every generated function for one frozen registry.
pub struct ScriptGenerator<'a> {
    registry: &'a TypeRegistry,
    config: &'a BridgeConfig,
    names: ScriptNames,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(registry: &'a TypeRegistry, config: &'a BridgeConfig) -> Self {
        Self {
            registry,
            config,
            names: ScriptNames::from_config(config),
        }
    }

    pub fn names(&self) -> &ScriptNames {
        &self.names
    }

    /// `(name, source)` of the write and read functions of one type.
    pub fn type_functions(&self, descriptor: &TypeDescriptor) -> [(String, String); 2] {
        let script = descriptor.script();
        let write = format!(
            "var {} = argument0\nvar {} = argument1\n{}\n",
            ARG_BUFFER, ARG, script.encode
        );
        let read = format!("var {} = argument0\n{}\n", RESULT_BUFFER, script.decode);
        [
            (self.names.write_type(descriptor), write),
            (self.names.read_type(descriptor), read),
        ]
    }

    pub fn write_dispatcher(&self) -> String {
        let dispatch = self.names.write_dispatch();
        let mut src = String::new();
        emit!(src, "var {} = argument0", ARG_BUFFER);
        emit!(src, "var typeId = argument1");
        emit!(src, "var {} = argument2", ARG);
        emit!(src, "if ((typeId & {}) != 0) {{", ARRAY_FLAG);
        emit!(src, "    var elementTypeId = typeId & ~{}", ARRAY_FLAG);
        emit!(src, "    var count = array_length({})", ARG);
        emit!(src, "    buffer_write({}, buffer_s32, count)", ARG_BUFFER);
        emit!(src, "    for (var i = 0; i < count; i++) {{");
        emit!(
            src,
            "        {}({}, elementTypeId, {}[i])",
            dispatch, ARG_BUFFER, ARG
        );
        emit!(src, "    }}");
        emit!(src, "    exit");
        emit!(src, "}}");
        emit!(src, "switch (typeId) {{");
        for descriptor in self.registry.descriptors() {
            emit!(
                src,
                "    case {}: {}({}, {}); break",
                descriptor.id().raw(),
                self.names.write_type(descriptor),
                ARG_BUFFER,
                ARG
            );
        }
        emit!(
            src,
            "    default: show_error(\"{}: unknown wire type id \" + string(typeId), true)",
            dispatch
        );
        emit!(src, "}}");
        src
    }

    pub fn read_dispatcher(&self) -> String {
        let dispatch = self.names.read_dispatch();
        let mut src = String::new();
        emit!(src, "var {} = argument0", RESULT_BUFFER);
        emit!(src, "var typeId = argument1");
        emit!(src, "if ((typeId & {}) != 0) {{", ARRAY_FLAG);
        emit!(src, "    var elementTypeId = typeId & ~{}", ARRAY_FLAG);
        emit!(
            src,
            "    var count = buffer_read({}, buffer_s32)",
            RESULT_BUFFER
        );
        emit!(src, "    var result = array_create(count)");
        emit!(src, "    for (var i = 0; i < count; i++) {{");
        emit!(
            src,
            "        result[i] = {}({}, elementTypeId)",
            dispatch, RESULT_BUFFER
        );
        emit!(src, "    }}");
        emit!(src, "    return result");
        emit!(src, "}}");
        emit!(src, "switch (typeId) {{");
        for descriptor in self.registry.descriptors() {
            emit!(
                src,
                "    case {}: return {}({})",
                descriptor.id().raw(),
                self.names.read_type(descriptor),
                RESULT_BUFFER
            );
        }
        emit!(src, "}}");
        emit!(
            src,
            "show_error(\"{}: unknown wire type id \" + string(typeId), true)",
            dispatch
        );
        src
    }

    /// Source of the shared call entry function.
    ///
    /// Arguments: type name, method name, return type id, argument count,
    /// then one `(type id, value)` pair per argument.
    pub fn call_function(&self) -> String {
        let prefix = self.names.prefix();
        let library = &self.config.native_library;
        let capacity = self.config.metadata_capacity;
        let write = self.names.write_dispatch();
        let read = self.names.read_dispatch();
        let slot_size = self.registry.pointer_width().bytes();
        let call_fn = format!("global.__{}_invoke", prefix);
        let size_fn = format!("global.__{}_result_size", prefix);
        let copy_fn = format!("global.__{}_copy_result", prefix);
        let release_fn = format!("global.__{}_release_result", prefix);

        let mut src = String::new();
        emit!(src, "var typeName = argument[0]");
        emit!(src, "var methodName = argument[1]");
        emit!(src, "var returnTypeId = argument[2]");
        emit!(src, "var argCount = argument[3]");
        src.push('\n');
        emit!(src, "if (!variable_global_exists(\"__{}_invoke\")) {{", prefix);
        emit!(
            src,
            "    {} = external_define(\"{}\", \"{}\", dll_cdecl, ty_real, 3, ty_string, ty_string, ty_string)",
            call_fn,
            library,
            entry::CALL
        );
        emit!(
            src,
            "    {} = external_define(\"{}\", \"{}\", dll_cdecl, ty_real, 1, ty_string)",
            size_fn,
            library,
            entry::RESULT_SIZE
        );
        emit!(
            src,
            "    {} = external_define(\"{}\", \"{}\", dll_cdecl, ty_real, 2, ty_string, ty_string)",
            copy_fn,
            library,
            entry::COPY_RESULT
        );
        emit!(
            src,
            "    {} = external_define(\"{}\", \"{}\", dll_cdecl, ty_real, 1, ty_string)",
            release_fn,
            library,
            entry::RELEASE_RESULT
        );
        emit!(src, "}}");
        src.push('\n');
        emit!(src, "var metadata = buffer_create({}, buffer_grow, 1)", capacity);
        emit!(src, "buffer_seek(metadata, buffer_seek_start, 4)");
        emit!(src, "buffer_write(metadata, buffer_string, typeName)");
        emit!(src, "buffer_write(metadata, buffer_string, methodName)");
        emit!(src, "buffer_write(metadata, buffer_u32, returnTypeId)");
        emit!(src, "buffer_write(metadata, buffer_u32, argCount)");
        emit!(src, "buffer_poke(metadata, 0, buffer_u32, buffer_tell(metadata))");
        src.push('\n');
        emit!(src, "var args = buffer_create({}, buffer_grow, 1)", capacity);
        emit!(src, "buffer_seek(args, buffer_seek_start, 4)");
        emit!(src, "for (var i = 0; i < argCount; i++) {{");
        emit!(src, "    var argTypeId = argument[4 + i * 2]");
        emit!(src, "    buffer_write(args, buffer_u32, argTypeId)");
        emit!(src, "    {}(args, argTypeId, argument[5 + i * 2])", write);
        emit!(src, "}}");
        emit!(src, "buffer_poke(args, 0, buffer_u32, buffer_tell(args))");
        src.push('\n');
        emit!(src, "var resultSlot = buffer_create({}, buffer_fixed, 1)", slot_size);
        emit!(src, "buffer_fill(resultSlot, 0, buffer_u8, 0, {})", slot_size);
        emit!(
            src,
            "external_call({}, buffer_get_address(metadata), buffer_get_address(args), buffer_get_address(resultSlot))",
            call_fn
        );
        emit!(src, "buffer_delete(metadata)");
        emit!(src, "buffer_delete(args)");
        src.push('\n');
        emit!(src, "var result = undefined");
        emit!(src, "if (returnTypeId != 0) {{");
        emit!(
            src,
            "    var resultSize = external_call({}, buffer_get_address(resultSlot))",
            size_fn
        );
        emit!(src, "    var resultBuffer = -1");
        emit!(src, "    if (resultSize >= 4) {{");
        emit!(
            src,
            "        resultBuffer = buffer_create(resultSize, buffer_fixed, 1)"
        );
        emit!(
            src,
            "        external_call({}, buffer_get_address(resultBuffer), buffer_get_address(resultSlot))",
            copy_fn
        );
        emit!(src, "    }}");
        emit!(
            src,
            "    external_call({}, buffer_get_address(resultSlot))",
            release_fn
        );
        emit!(src, "    if (resultBuffer != -1) {{");
        emit!(src, "        buffer_seek(resultBuffer, buffer_seek_start, 4)");
        emit!(src, "        result = {}(resultBuffer, returnTypeId)", read);
        emit!(src, "        buffer_delete(resultBuffer)");
        emit!(src, "    }}");
        emit!(src, "}}");
        emit!(src, "buffer_delete(resultSlot)");
        emit!(src, "return result");
        src
    }

    /// Every generated function, per-type functions first.
    pub fn functions(&self) -> Vec<(String, String)> {
        let mut functions = Vec::with_capacity(self.registry.len() * 2 + 3);
        for descriptor in self.registry.descriptors() {
            functions.extend(self.type_functions(descriptor));
        }
        functions.push((self.names.write_dispatch(), self.write_dispatcher()));
        functions.push((self.names.read_dispatch(), self.read_dispatcher()));
        functions.push((self.names.call(), self.call_function()));
        functions
    }
}

/// Emit all generated functions of a frozen registry through `host`.
///
/// Runs once per registry; later calls fail with
/// [`BridgeError::DispatchFinalized`]. If the host rejects a function the
/// registry stays unfinalized, so emission can be retried against a fresh
/// host. Returns the number of functions defined.
pub fn finalize_dispatch(
    registry: &TypeRegistry,
    config: &BridgeConfig,
    host: &mut dyn ScriptHost,
) -> BridgeResult<usize> {
    config.validate()?;
    if !registry.claim_dispatch() {
        return Err(BridgeError::DispatchFinalized);
    }

    let functions = ScriptGenerator::new(registry, config).functions();
    for (name, source) in &functions {
        if let Err(reason) = host.define_function(name, source) {
            registry.release_dispatch();
            log::warn!("[script] {} rejected by the host: {}", name, reason);
            return Err(BridgeError::Script {
                function: name.clone(),
                reason,
            });
        }
        log::debug!("[script] defined {}", name);
    }
    log::info!(
        "[script] emitted {} functions for {} types",
        functions.len(),
        registry.len()
    );
    Ok(functions.len())
}
