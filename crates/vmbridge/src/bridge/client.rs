// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Caller side of a call.

use super::dispatch::CallBridge;
use super::handle::{ResultBuffer, ResultHandle};
use super::protocol::encode_call;
use crate::error::{BridgeError, BridgeResult};
use crate::reader::WireReader;
use crate::registry::{TypeLookup, TypeRegistry};
use crate::type_id::{WireTypeId, LENGTH_PREFIX_SIZE};
use crate::value::{NativeValue, WireValue};

/// The four native entry points, as seen by a caller.
pub trait Endpoint {
    /// Run a call. `Some` holds the result of a non-void call.
    fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultHandle>;
    fn result_size(&self, handle: &ResultHandle) -> u32;
    fn copy_result(&self, handle: &ResultHandle, dest: &mut [u8]);
    fn release_result(&self, handle: ResultHandle);
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
    fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultHandle> {
        (**self).invoke(metadata, arguments)
    }

    fn result_size(&self, handle: &ResultHandle) -> u32 {
        (**self).result_size(handle)
    }

    fn copy_result(&self, handle: &ResultHandle, dest: &mut [u8]) {
        (**self).copy_result(handle, dest)
    }

    fn release_result(&self, handle: ResultHandle) {
        (**self).release_result(handle)
    }
}

/// Releases a result handle when dropped, whatever happened in between.
struct ReleaseGuard<'e, E: Endpoint + ?Sized> {
    endpoint: &'e E,
    handle: Option<ResultHandle>,
}

impl<'e, E: Endpoint + ?Sized> ReleaseGuard<'e, E> {
    fn new(endpoint: &'e E, handle: ResultHandle) -> Self {
        Self {
            endpoint,
            handle: Some(handle),
        }
    }

    fn size(&self) -> u32 {
        self.handle
            .as_ref()
            .map_or(0, |handle| self.endpoint.result_size(handle))
    }

    fn copy(&self, dest: &mut [u8]) {
        if let Some(handle) = &self.handle {
            self.endpoint.copy_result(handle, dest);
        }
    }
}

impl<E: Endpoint + ?Sized> Drop for ReleaseGuard<'_, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.endpoint.release_result(handle);
        }
    }
}

/// Drives calls through an [`Endpoint`].
pub struct CallClient<'r, E: Endpoint> {
    registry: &'r TypeRegistry,
    endpoint: E,
}

impl<'r, E: Endpoint> CallClient<'r, E> {
    pub fn new(registry: &'r TypeRegistry, endpoint: E) -> Self {
        Self { registry, endpoint }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Call `type_name::method_name` with explicitly typed arguments.
    pub fn call(
        &self,
        type_name: &str,
        method_name: &str,
        return_type: WireTypeId,
        args: &[(WireTypeId, WireValue)],
    ) -> BridgeResult<WireValue> {
        let call = encode_call(self.registry, type_name, method_name, return_type, args)?;
        let handle = self.endpoint.invoke(&call.metadata, &call.arguments);

        if return_type.is_void() {
            if let Some(stray) = handle {
                self.endpoint.release_result(stray);
            }
            return Ok(WireValue::Void);
        }
        let Some(handle) = handle else {
            return Err(BridgeError::InvalidValue {
                reason: format!("{}::{} produced no result", type_name, method_name),
            });
        };

        let guard = ReleaseGuard::new(&self.endpoint, handle);
        let size = guard.size() as usize;
        if size < LENGTH_PREFIX_SIZE {
            return Err(BridgeError::OutOfRange {
                offset: 0,
                bound: size,
                reason: "result shorter than its length prefix",
            });
        }
        let mut copy = vec![0u8; size];
        guard.copy(&mut copy);
        drop(guard);

        let mut reader = WireReader::bind(self.registry, &copy)?;
        reader.read(return_type)
    }

    /// Call with argument and return ids derived from the values' types.
    pub fn call_typed<R: NativeValue>(
        &self,
        type_name: &str,
        method_name: &str,
        args: Vec<WireValue>,
    ) -> BridgeResult<R> {
        let return_type = self.registry.type_id_of(&R::native_type())?;
        let typed = args
            .into_iter()
            .map(|value| Ok((self.registry.type_id_of(&value.native_type())?, value)))
            .collect::<BridgeResult<Vec<_>>>()?;
        R::from_wire(self.call(type_name, method_name, return_type, &typed)?)
    }
}

/// In-process endpoint backed by a [`CallBridge`].
pub struct LocalEndpoint<'b> {
    bridge: &'b CallBridge,
}

impl<'b> LocalEndpoint<'b> {
    pub fn new(bridge: &'b CallBridge) -> Self {
        Self { bridge }
    }
}

impl Endpoint for LocalEndpoint<'_> {
    fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultHandle> {
        self.bridge
            .invoke(metadata, arguments)
            .map(ResultBuffer::into_handle)
    }

    fn result_size(&self, handle: &ResultHandle) -> u32 {
        // SAFETY: handles reach this endpoint only from `invoke` above and
        // are consumed on release, so the buffer is live.
        unsafe { ResultBuffer::from_raw(handle.as_ptr()) }.map_or(0, ResultBuffer::size)
    }

    fn copy_result(&self, handle: &ResultHandle, dest: &mut [u8]) {
        // SAFETY: as in `result_size`.
        if let Some(buffer) = unsafe { ResultBuffer::from_raw(handle.as_ptr()) } {
            buffer.copy_to(dest);
        }
    }

    fn release_result(&self, handle: ResultHandle) {
        // SAFETY: as in `result_size`; the handle is consumed here.
        unsafe { ResultBuffer::release_raw(handle.into_raw()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{FunctionTable, RecordingSink};
    use crate::registry::TypeRegistryBuilder;
    use std::cell::Cell;
    use std::sync::Arc;

    #[derive(Default)]
    struct Counts {
        invoke: Cell<usize>,
        size: Cell<usize>,
        copy: Cell<usize>,
        release: Cell<usize>,
    }

    struct Counting<'b> {
        inner: LocalEndpoint<'b>,
        counts: Counts,
    }

    impl Endpoint for Counting<'_> {
        fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultHandle> {
            self.counts.invoke.set(self.counts.invoke.get() + 1);
            self.inner.invoke(metadata, arguments)
        }
        fn result_size(&self, handle: &ResultHandle) -> u32 {
            self.counts.size.set(self.counts.size.get() + 1);
            self.inner.result_size(handle)
        }
        fn copy_result(&self, handle: &ResultHandle, dest: &mut [u8]) {
            self.counts.copy.set(self.counts.copy.get() + 1);
            self.inner.copy_result(handle, dest)
        }
        fn release_result(&self, handle: ResultHandle) {
            self.counts.release.set(self.counts.release.get() + 1);
            self.inner.release_result(handle)
        }
    }

    fn bridge() -> CallBridge {
        let registry = Arc::new(TypeRegistryBuilder::new().freeze());
        let mut functions = FunctionTable::new();
        functions
            .register("Text", "shout", |s: String| s.to_uppercase())
            .expect("shout");
        functions.register("Game", "noop", |_: bool| ()).expect("noop");
        CallBridge::new(registry, functions).with_sink(Arc::new(RecordingSink::new()))
    }

    #[test]
    fn test_typed_call_roundtrip() {
        let bridge = bridge();
        let client = CallClient::new(bridge.registry(), LocalEndpoint::new(&bridge));
        let out: String = client
            .call_typed("Text", "shout", vec!["hi".into()])
            .expect("call");
        assert_eq!(out, "HI");
    }

    #[test]
    fn test_void_call_skips_handshake() {
        let bridge = bridge();
        let endpoint = Counting {
            inner: LocalEndpoint::new(&bridge),
            counts: Counts::default(),
        };
        let client = CallClient::new(bridge.registry(), &endpoint);
        client
            .call("Game", "noop", WireTypeId::VOID, &[(WireTypeId::BOOL, true.into())])
            .expect("void call");
        assert_eq!(endpoint.counts.invoke.get(), 1);
        assert_eq!(endpoint.counts.size.get(), 0);
        assert_eq!(endpoint.counts.copy.get(), 0);
        assert_eq!(endpoint.counts.release.get(), 0);
    }

    #[test]
    fn test_non_void_call_releases_once() {
        let bridge = bridge();
        let endpoint = Counting {
            inner: LocalEndpoint::new(&bridge),
            counts: Counts::default(),
        };
        let client = CallClient::new(bridge.registry(), &endpoint);
        let value = client
            .call("Text", "shout", WireTypeId::STRING, &[(WireTypeId::STRING, "a".into())])
            .expect("call");
        assert_eq!(value, WireValue::String("A".into()));
        assert_eq!(endpoint.counts.size.get(), 1);
        assert_eq!(endpoint.counts.copy.get(), 1);
        assert_eq!(endpoint.counts.release.get(), 1);
    }

    /// Shrinks the declared length of every copied result.
    struct Truncating<'b>(Counting<'b>);

    impl Endpoint for Truncating<'_> {
        fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultHandle> {
            self.0.invoke(metadata, arguments)
        }
        fn result_size(&self, handle: &ResultHandle) -> u32 {
            self.0.result_size(handle)
        }
        fn copy_result(&self, handle: &ResultHandle, dest: &mut [u8]) {
            self.0.copy_result(handle, dest);
            dest[0] -= 1;
        }
        fn release_result(&self, handle: ResultHandle) {
            self.0.release_result(handle)
        }
    }

    #[test]
    fn test_release_when_decoding_fails() {
        let bridge = bridge();
        let endpoint = Truncating(Counting {
            inner: LocalEndpoint::new(&bridge),
            counts: Counts::default(),
        });
        let client = CallClient::new(bridge.registry(), &endpoint);
        let err = client
            .call("Text", "shout", WireTypeId::STRING, &[(WireTypeId::STRING, "abc".into())])
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::OutOfRange {
                reason: "unterminated string",
                ..
            }
        ));
        assert_eq!(endpoint.0.counts.copy.get(), 1);
        assert_eq!(endpoint.0.counts.release.get(), 1);
    }

    #[test]
    fn test_missing_result_is_an_error() {
        let bridge = bridge();
        let client = CallClient::new(bridge.registry(), LocalEndpoint::new(&bridge));
        let err = client
            .call("Text", "whisper", WireTypeId::STRING, &[(WireTypeId::STRING, "a".into())])
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { .. }));
    }
}
