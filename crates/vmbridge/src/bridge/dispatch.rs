// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native side of a call.

use super::functions::FunctionTable;
use super::handle::ResultBuffer;
use super::protocol::{decode_call, DecodedCall};
use super::sink::{ErrorSink, LogSink};
use crate::config::DEFAULT_WRITER_CAPACITY;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::TypeRegistry;
use crate::writer::WireWriter;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Services calls coming from the scripting runtime.
///
/// Immutable once built: a frozen registry, a function table and an error
/// sink. Failures never leave [`CallBridge::invoke`]; they are reported to the
/// sink and the call produces no result.
pub struct CallBridge {
    registry: Arc<TypeRegistry>,
    functions: FunctionTable,
    sink: Arc<dyn ErrorSink>,
    writer_capacity: usize,
}

impl CallBridge {
    pub fn new(registry: Arc<TypeRegistry>, functions: FunctionTable) -> Self {
        Self {
            registry,
            functions,
            sink: Arc::new(LogSink),
            writer_capacity: DEFAULT_WRITER_CAPACITY,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_writer_capacity(mut self, capacity: usize) -> Self {
        self.writer_capacity = capacity;
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Decode, resolve and run one call.
    ///
    /// Returns the result buffer of a successful non-void call, `None`
    /// otherwise.
    pub fn invoke(&self, metadata: &[u8], arguments: &[u8]) -> Option<ResultBuffer> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(metadata, arguments)));
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                self.sink.report(&err);
                None
            }
            Err(payload) => {
                self.sink.report(&BridgeError::Panic {
                    target: "call dispatch".to_string(),
                    message: panic_message(payload.as_ref()),
                });
                None
            }
        }
    }

    fn dispatch(&self, metadata: &[u8], arguments: &[u8]) -> BridgeResult<Option<ResultBuffer>> {
        let DecodedCall {
            descriptor,
            args,
            params,
        } = decode_call(&self.registry, metadata, arguments)?;
        let target = self
            .functions
            .resolve(&descriptor.type_name, &descriptor.method_name, &params)?;

        let result = catch_unwind(AssertUnwindSafe(|| target.call(args)))
            .map_err(|payload| BridgeError::Panic {
                target: target.signature().to_string(),
                message: panic_message(payload.as_ref()),
            })??;

        if descriptor.return_type.is_void() {
            return Ok(None);
        }

        let mut writer = WireWriter::with_capacity(&self.registry, self.writer_capacity);
        writer.write(descriptor.return_type, &result)?;
        Ok(Some(ResultBuffer::new(writer.finalize()?)))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::encode_call;
    use crate::bridge::RecordingSink;
    use crate::reader::WireReader;
    use crate::registry::TypeRegistryBuilder;
    use crate::type_id::WireTypeId;
    use crate::value::{NativeType, WireValue};

    fn bridge(sink: Arc<RecordingSink>) -> CallBridge {
        let registry = Arc::new(TypeRegistryBuilder::new().freeze());
        let mut functions = FunctionTable::new();
        functions
            .register("Math", "add", |a: i32, b: i32| a.wrapping_add(b))
            .expect("add");
        functions
            .register("Math", "boom", |_: i32| -> i32 { panic!("boom") })
            .expect("boom");
        functions.register("Game", "noop", || ()).expect("noop");
        CallBridge::new(registry, functions).with_sink(sink)
    }

    #[test]
    fn test_invoke_returns_result_buffer() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        let call = encode_call(
            bridge.registry(),
            "Math",
            "add",
            WireTypeId::I32,
            &[(WireTypeId::I32, WireValue::I32(2)), (WireTypeId::I32, WireValue::I32(40))],
        )
        .expect("encode");

        let result = bridge
            .invoke(&call.metadata, &call.arguments)
            .expect("non-void result");
        assert_eq!(result.size(), 8);
        let mut reader = WireReader::bind(bridge.registry(), result.as_bytes()).expect("bind");
        assert_eq!(reader.read(WireTypeId::I32), Ok(WireValue::I32(42)));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_void_call_has_no_result() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        let call = encode_call(bridge.registry(), "Game", "noop", WireTypeId::VOID, &[])
            .expect("encode");
        assert!(bridge.invoke(&call.metadata, &call.arguments).is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_target_reported() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        let call = encode_call(
            bridge.registry(),
            "Math",
            "add",
            WireTypeId::I32,
            &[(WireTypeId::I64, WireValue::I64(1)), (WireTypeId::I32, WireValue::I32(2))],
        )
        .expect("encode");

        assert!(bridge.invoke(&call.metadata, &call.arguments).is_none());
        assert_eq!(
            sink.take(),
            vec![BridgeError::MissingTarget {
                type_name: "Math".into(),
                method_name: "add".into(),
                params: vec![NativeType::I64, NativeType::I32],
            }]
        );
    }

    #[test]
    fn test_panic_is_contained() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        let call = encode_call(
            bridge.registry(),
            "Math",
            "boom",
            WireTypeId::I32,
            &[(WireTypeId::I32, WireValue::I32(1))],
        )
        .expect("encode");

        assert!(bridge.invoke(&call.metadata, &call.arguments).is_none());
        let reports = sink.take();
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            &reports[0],
            BridgeError::Panic { target, message }
                if target == "Math::boom(i32) -> i32" && message == "boom"
        ));
    }

    #[test]
    fn test_garbage_metadata_reported() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        assert!(bridge.invoke(&[200, 0, 0, 0, 1], &[4, 0, 0, 0]).is_none());
        assert!(matches!(sink.take().as_slice(), [BridgeError::OutOfRange { .. }]));
    }

    #[test]
    fn test_return_type_mismatch_reported() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = bridge(Arc::clone(&sink));
        let call = encode_call(
            bridge.registry(),
            "Math",
            "add",
            WireTypeId::STRING,
            &[(WireTypeId::I32, WireValue::I32(1)), (WireTypeId::I32, WireValue::I32(2))],
        )
        .expect("encode");
        assert!(bridge.invoke(&call.metadata, &call.arguments).is_none());
        assert!(matches!(sink.take().as_slice(), [BridgeError::TypeMismatch { .. }]));
    }
}
