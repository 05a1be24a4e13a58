// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call bridge.
//!
//! A call crosses the boundary as two wire buffers and a result slot:
//!
//! ```text
//! metadata:  [len] type name \0 | method name \0 | return id u32 | arg count u32
//! arguments: [len] (arg id u32 | encoded value)*
//! slot:      pointer-sized, caller-allocated, filled by the native side
//! ```
//!
//! The native side ([`CallBridge`]) decodes the call, resolves the target in
//! a [`FunctionTable`] by exact name and parameter list, invokes it and
//! leaves a [`ResultBuffer`] in the slot for non-void calls. Errors and
//! panics stop there and are reported to an [`ErrorSink`].
//!
//! The caller side ([`CallClient`]) encodes the call, drives an
//! [`Endpoint`] and performs the size/copy/release handshake. Release
//! happens exactly once per produced result, through a drop guard.

mod client;
mod dispatch;
mod expr;
mod functions;
mod handle;
mod protocol;
mod sink;

pub use client::{CallClient, Endpoint, LocalEndpoint};
pub use dispatch::CallBridge;
pub use expr::call_expression;
pub use functions::{FunctionTable, NativeFn, NativeFunction, NativeSignature};
pub use handle::{wire_buffer_from_ptr, ResultBuffer, ResultHandle};
pub use protocol::{decode_call, encode_call, CallDescriptor, DecodedCall, EncodedCall};
pub use sink::{ErrorSink, LogSink, RecordingSink};

/// Symbol names of the native entry points.
pub mod entry {
    /// `(metadata, arguments, result_slot)`
    pub const CALL: &str = "vmbridge_call";
    /// `(result_slot) -> u32`
    pub const RESULT_SIZE: &str = "vmbridge_result_size";
    /// `(dest, result_slot)`
    pub const COPY_RESULT: &str = "vmbridge_copy_result";
    /// `(result_slot)`
    pub const RELEASE_RESULT: &str = "vmbridge_release_result";
}
