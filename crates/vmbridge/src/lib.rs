// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # vmbridge - scripting VM to native call bridge
//!
//! Lets code running inside an embedded, dynamically typed scripting VM call
//! statically compiled native functions by name, with typed arguments and a
//! typed result, over a byte-buffer wire protocol.
//!
//! ## Quick Start
//!
//! ```rust
//! use vmbridge::{
//!     BridgeConfig, BridgeHost, CallClient, LocalEndpoint, ScriptCollector, WireRecord,
//! };
//!
//! #[derive(Debug, PartialEq, WireRecord)]
//! struct Vec2 {
//!     x: f32,
//!     y: f32,
//! }
//!
//! # fn main() -> vmbridge::BridgeResult<()> {
//! let mut host = BridgeHost::new(BridgeConfig::default())?;
//! host.register_record::<Vec2>()?;
//! let scale = host.register_function("Vec2", "scale", |v: Vec2, k: f32| Vec2 {
//!     x: v.x * k,
//!     y: v.y * k,
//! })?;
//!
//! // Script side: expression to paste into mod code, plus generated helpers.
//! let expr = host.call_expression(&scale, &["pos", "2"])?;
//! assert!(expr.starts_with("vmbridge_call(\"Vec2\", \"scale\", 1000, 2, 1000, pos"));
//! let mut scripts = ScriptCollector::new();
//! host.finalize(&mut scripts)?;
//!
//! // Native side.
//! let bridge = host.into_bridge();
//! let client = CallClient::new(bridge.registry(), LocalEndpoint::new(&bridge));
//! let out: Vec2 = client.call_typed(
//!     "Vec2",
//!     "scale",
//!     vec![vmbridge::NativeValue::into_wire(Vec2 { x: 1.0, y: -2.0 }), 2.0f32.into()],
//! )?;
//! assert_eq!(out, Vec2 { x: 2.0, y: -4.0 });
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  Script VM     generated <prefix>_call / _write / _read     |
//! +-------------------------------------------------------------+
//! |  Entry points  vmbridge_call / _result_size / _copy_result  |
//! |                / _release_result   (vmbridge-c)             |
//! +-------------------------------------------------------------+
//! |  CallBridge    decode -> resolve -> invoke -> encode result |
//! +-------------------------------------------------------------+
//! |  Wire codec    WireWriter / WireReader over TypeRegistry    |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TypeRegistryBuilder`] | Startup registry: `register`, `override_type`, `freeze` |
//! | [`TypeRegistry`] | Frozen id <-> native type mapping, shared with `Arc` |
//! | [`WireWriter`] / [`WireReader`] | Length-prefixed little-endian codec |
//! | [`CallBridge`] | Native side of a call, errors go to an [`ErrorSink`] |
//! | [`CallClient`] | Caller side, size/copy/release handshake |
//! | [`BridgeHost`] | Runtime lifecycle façade for plugin hosts |

// Allow the derive macro to work inside this crate's tests
extern crate self as vmbridge;

/// Call marshaling, native dispatch and result handles.
pub mod bridge;
/// Codec descriptors bundling native and script halves.
pub mod codec;
/// Bridge parameters and YAML loading.
pub mod config;
/// Error type.
pub mod error;
/// Runtime lifecycle façade.
pub mod host;
/// Wire reader.
pub mod reader;
/// Type registry.
pub mod registry;
/// Script code generation.
pub mod script;
/// Wire type ids and wire constants.
pub mod type_id;
/// Native type tokens and dynamic values.
pub mod value;
/// Wire writer.
pub mod writer;

pub use bridge::{
    call_expression, CallBridge, CallClient, Endpoint, ErrorSink, FunctionTable, LocalEndpoint,
    LogSink, NativeFunction, NativeSignature, RecordingSink, ResultBuffer, ResultHandle,
};
pub use codec::{Codec, ScriptCodec, WireRecord};
#[cfg(feature = "config-loaders")]
pub use config::ConfigLoader;
pub use config::{BridgeConfig, PointerWidth};
pub use error::{BridgeError, BridgeResult};
pub use host::BridgeHost;
pub use reader::WireReader;
pub use registry::{TypeDescriptor, TypeLookup, TypeRegistry, TypeRegistryBuilder};
pub use script::{finalize_dispatch, ScriptBuffer, ScriptCollector, ScriptHost, ScriptNames};
pub use type_id::{has_array_flag, strip_array_flag, WireTypeId, ARRAY_FLAG};
pub use value::{Half, NativeType, NativeValue, WireValue};
pub use writer::WireWriter;

// Derive macro (for #[derive(vmbridge::WireRecord)])
pub use vmbridge_codegen::WireRecord;

/// vmbridge version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
