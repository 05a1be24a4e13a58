// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Drive the exported entry points the way generated script does: fill a
// result slot, query its size, copy, release.

#![allow(clippy::float_cmp)]

use std::os::raw::c_void;
use std::ptr;
use std::sync::{Arc, Once};

use vmbridge::bridge::encode_call;
use vmbridge::{
    BridgeConfig, BridgeHost, CallBridge, RecordingSink, TypeRegistry, WireReader, WireTypeId,
    WireValue,
};
use vmbridge_c::{
    install, installed, vmbridge_call, vmbridge_copy_result, vmbridge_is_installed,
    vmbridge_release_result, vmbridge_result_size, VmBridgeStatus,
};

static INSTALL: Once = Once::new();

fn sink() -> Arc<RecordingSink> {
    static SINK: std::sync::OnceLock<Arc<RecordingSink>> = std::sync::OnceLock::new();
    Arc::clone(SINK.get_or_init(|| Arc::new(RecordingSink::new())))
}

fn bridge() -> &'static CallBridge {
    INSTALL.call_once(|| {
        let mut host = BridgeHost::new(BridgeConfig::default()).expect("host");
        host.register_function("Text", "repeat", |s: String, n: u8| s.repeat(usize::from(n)))
            .expect("repeat");
        host.register_function("Game", "tick", |_: u32| ()).expect("tick");
        let status = install(host.into_bridge().with_sink(sink()));
        assert_eq!(status, VmBridgeStatus::VmBridgeOk);
    });
    installed().expect("installed")
}

fn call(
    registry: &TypeRegistry,
    method: (&str, &str),
    ret: WireTypeId,
    args: &[(WireTypeId, WireValue)],
) -> *mut c_void {
    let call = encode_call(registry, method.0, method.1, ret, args).expect("encode");
    let mut slot: *mut c_void = ptr::null_mut();
    // SAFETY: both buffers are finalized wire buffers and the slot is local.
    unsafe { vmbridge_call(call.metadata.as_ptr(), call.arguments.as_ptr(), &mut slot) };
    slot
}

#[test]
fn test_non_void_call_through_entry_points() {
    let bridge = bridge();
    let mut slot = call(
        bridge.registry(),
        ("Text", "repeat"),
        WireTypeId::STRING,
        &[
            (WireTypeId::STRING, "ab".into()),
            (WireTypeId::U8, WireValue::U8(3)),
        ],
    );
    assert!(!slot.is_null());

    // SAFETY: the slot holds a live handle until released below.
    let size = unsafe { vmbridge_result_size(&slot) };
    assert_eq!(size, 11.0);
    let mut copy = vec![0u8; size as usize];
    unsafe { vmbridge_copy_result(copy.as_mut_ptr(), &slot) };
    unsafe { vmbridge_release_result(&mut slot) };
    assert!(slot.is_null());

    let mut reader = WireReader::bind(bridge.registry(), &copy).expect("bind");
    assert_eq!(reader.read_string(), Ok("ababab".to_string()));
}

#[test]
fn test_void_call_leaves_slot_empty() {
    let bridge = bridge();
    let slot = call(
        bridge.registry(),
        ("Game", "tick"),
        WireTypeId::VOID,
        &[(WireTypeId::U32, WireValue::U32(1))],
    );
    assert!(slot.is_null());
}

#[test]
fn test_missing_target_leaves_slot_empty() {
    let bridge = bridge();
    let slot = call(bridge.registry(), ("Text", "shout"), WireTypeId::STRING, &[]);
    assert!(slot.is_null());
    assert!(sink().take().iter().any(|err| matches!(
        err,
        vmbridge::BridgeError::MissingTarget { method_name, .. } if method_name == "shout"
    )));
}

#[test]
fn test_unaligned_slot() {
    let bridge = bridge();
    let call = encode_call(
        bridge.registry(),
        "Text",
        "repeat",
        WireTypeId::STRING,
        &[
            (WireTypeId::STRING, "z".into()),
            (WireTypeId::U8, WireValue::U8(2)),
        ],
    )
    .expect("encode");

    // Script buffers give no alignment guarantee
    let mut storage = [0u8; 1 + std::mem::size_of::<*mut c_void>()];
    let slot = storage[1..].as_mut_ptr().cast::<*mut c_void>();
    // SAFETY: the slot covers a pointer-sized region; entry points read and
    // write it unaligned.
    unsafe {
        vmbridge_call(call.metadata.as_ptr(), call.arguments.as_ptr(), slot);
        assert_eq!(vmbridge_result_size(slot), 7.0);
        vmbridge_release_result(slot);
        assert_eq!(vmbridge_result_size(slot), 0.0);
    }
}

#[test]
fn test_second_install_rejected() {
    bridge();
    assert!(vmbridge_is_installed());
    let other = BridgeHost::new(BridgeConfig::default())
        .expect("host")
        .into_bridge();
    assert_eq!(install(other), VmBridgeStatus::VmBridgeAlreadyInstalled);
}
