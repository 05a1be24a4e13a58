// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metadata and argument buffers of a call.

use crate::error::{BridgeError, BridgeResult};
use crate::reader::WireReader;
use crate::registry::{TypeLookup, TypeRegistry};
use crate::type_id::WireTypeId;
use crate::value::{NativeType, WireValue};
use crate::writer::WireWriter;

/// What is being called and what comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub type_name: String,
    pub method_name: String,
    pub return_type: WireTypeId,
    pub arg_count: u32,
}

/// The two finalized buffers of an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCall {
    pub metadata: Vec<u8>,
    pub arguments: Vec<u8>,
}

/// A call as seen by the native side.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCall {
    pub descriptor: CallDescriptor,
    pub args: Vec<WireValue>,
    /// Native parameter types derived from the argument ids.
    pub params: Vec<NativeType>,
}

/// Encode the metadata and argument buffers of a call.
pub fn encode_call(
    registry: &TypeRegistry,
    type_name: &str,
    method_name: &str,
    return_type: WireTypeId,
    args: &[(WireTypeId, WireValue)],
) -> BridgeResult<EncodedCall> {
    let arg_count = u32::try_from(args.len()).map_err(|_| BridgeError::InvalidValue {
        reason: format!("{} arguments exceed the wire count", args.len()),
    })?;
    // Rejects ids that the native side could not decode either.
    registry.lookup_by_id(return_type)?;

    let mut metadata = WireWriter::new(registry);
    metadata.write_string(type_name)?;
    metadata.write_string(method_name)?;
    metadata.write_type_id(return_type);
    metadata.write_u32(arg_count);

    let mut arguments = WireWriter::new(registry);
    for (id, value) in args {
        arguments.write_type_id(*id);
        arguments.write(*id, value)?;
    }

    Ok(EncodedCall {
        metadata: metadata.finalize()?,
        arguments: arguments.finalize()?,
    })
}

/// Decode a call from its metadata and argument buffers.
pub fn decode_call(
    registry: &TypeRegistry,
    metadata: &[u8],
    arguments: &[u8],
) -> BridgeResult<DecodedCall> {
    let mut reader = WireReader::bind(registry, metadata)?;
    let descriptor = CallDescriptor {
        type_name: reader.read_string()?,
        method_name: reader.read_string()?,
        return_type: reader.read_type_id()?,
        arg_count: reader.read_u32()?,
    };

    reader.reset(arguments)?;
    let count = descriptor.arg_count as usize;
    // Each argument carries at least its 4-byte id.
    let capacity = count.min(reader.remaining() / 4);
    let mut args = Vec::with_capacity(capacity);
    let mut params = Vec::with_capacity(capacity);
    for _ in 0..count {
        let id = reader.read_type_id()?;
        params.push(registry.native_type_of(id)?);
        args.push(reader.read(id)?);
    }

    log::debug!(
        "[bridge] decoded call {}::{} ({} args, returns {})",
        descriptor.type_name,
        descriptor.method_name,
        count,
        descriptor.return_type
    );
    Ok(DecodedCall {
        descriptor,
        args,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistryBuilder;
    use crate::value::NativeValue;

    #[test]
    fn test_metadata_layout() {
        let registry = TypeRegistryBuilder::new().freeze();
        let call = encode_call(&registry, "M", "f", WireTypeId::I32, &[]).expect("encode");
        assert_eq!(
            call.metadata,
            vec![16, 0, 0, 0, b'M', 0, b'f', 0, 6, 0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(call.arguments, vec![4, 0, 0, 0]);
    }

    #[test]
    fn test_argument_ids_precede_values() {
        let registry = TypeRegistryBuilder::new().freeze();
        let call = encode_call(
            &registry,
            "Math",
            "scale",
            WireTypeId::F32,
            &[
                (WireTypeId::U8, WireValue::U8(9)),
                (WireTypeId::U8.array(), vec![1u8].into_wire()),
            ],
        )
        .expect("encode");
        assert_eq!(
            call.arguments,
            vec![18, 0, 0, 0, 1, 0, 0, 0, 9, 1, 0, 1, 0, 1, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_decode_derives_param_types() {
        let registry = TypeRegistryBuilder::new().freeze();
        let call = encode_call(
            &registry,
            "Text",
            "join",
            WireTypeId::STRING,
            &[
                (
                    WireTypeId::STRING.array(),
                    vec![String::from("a"), String::from("b")].into_wire(),
                ),
                (WireTypeId::CHAR, WireValue::Char(',')),
            ],
        )
        .expect("encode");

        let decoded = decode_call(&registry, &call.metadata, &call.arguments).expect("decode");
        assert_eq!(decoded.descriptor.type_name, "Text");
        assert_eq!(decoded.descriptor.method_name, "join");
        assert_eq!(decoded.descriptor.return_type, WireTypeId::STRING);
        assert_eq!(decoded.descriptor.arg_count, 2);
        assert_eq!(
            decoded.params,
            vec![NativeType::array_of(NativeType::String), NativeType::Char]
        );
        assert_eq!(decoded.args[1], WireValue::Char(','));
    }

    #[test]
    fn test_decode_truncated_arguments() {
        let registry = TypeRegistryBuilder::new().freeze();
        let call = encode_call(
            &registry,
            "M",
            "f",
            WireTypeId::VOID,
            &[(WireTypeId::I64, WireValue::I64(1))],
        )
        .expect("encode");
        let mut arguments = call.arguments.clone();
        arguments.truncate(10);
        arguments[0] = 10;
        assert!(matches!(
            decode_call(&registry, &call.metadata, &arguments),
            Err(BridgeError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_unknown_return_type() {
        let registry = TypeRegistryBuilder::new().freeze();
        assert!(matches!(
            encode_call(&registry, "M", "f", WireTypeId::from_raw(5000), &[]),
            Err(BridgeError::UnknownTypeId { .. })
        ));
    }
}
