// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # vmbridge C entry points
//!
//! The four functions the scripting runtime binds through its foreign-call
//! mechanism, plus logger setup and error forwarding. The native host builds a
//! [`vmbridge::CallBridge`] at startup and hands it to [`install`]; calls made
//! before that produce no result.
//!
//! Every entry point that deals with a result takes the address of the
//! caller's result slot, a pointer-sized cell the call entry fills with the
//! result handle. The slot may be unaligned.
//!
//! # Safety
//!
//! The `extern "C"` functions are `unsafe` and require the caller to uphold
//! the invariants documented on each one. Null pointers are always no-ops.

mod logging;

pub use logging::*;

use std::os::raw::c_void;
use std::ptr;
use std::sync::OnceLock;

use vmbridge::bridge::wire_buffer_from_ptr;
use vmbridge::{CallBridge, ResultBuffer};

static BRIDGE: OnceLock<CallBridge> = OnceLock::new();

/// Status codes returned by setup functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmBridgeStatus {
    /// Operation completed successfully
    VmBridgeOk = 0,
    /// Invalid argument provided (null pointer, invalid value)
    VmBridgeInvalidArgument = 1,
    /// Generic operation failure
    VmBridgeOperationFailed = 2,
    /// A bridge is already installed for this process
    VmBridgeAlreadyInstalled = 3,
}

/// Install the process-wide bridge served by the entry points.
///
/// Only the first installation takes effect. Build the bridge with
/// [`ForeignSink`] to have dispatch failures reach the host's error
/// callback.
pub fn install(bridge: CallBridge) -> VmBridgeStatus {
    let functions = bridge.functions().len();
    let types = bridge.registry().len();
    match BRIDGE.set(bridge) {
        Ok(()) => {
            log::info!(
                "[bridge] installed ({} types, {} native functions)",
                types,
                functions
            );
            VmBridgeStatus::VmBridgeOk
        }
        Err(_) => {
            log::warn!("[bridge] a bridge is already installed, ignoring the new one");
            VmBridgeStatus::VmBridgeAlreadyInstalled
        }
    }
}

/// The installed bridge, if any.
pub fn installed() -> Option<&'static CallBridge> {
    BRIDGE.get()
}

/// Whether a bridge has been installed
#[no_mangle]
pub extern "C" fn vmbridge_is_installed() -> bool {
    BRIDGE.get().is_some()
}

/// Run one call
///
/// The slot is cleared first, then receives the result handle of a
/// successful non-void call. Failures are reported by the bridge's error sink
/// and leave the slot empty.
///
/// # Safety
/// - `metadata` and `arguments` must be null or point to length-prefixed
///   wire buffers, readable up to their declared length.
/// - `result_slot` must be null or point to a writable pointer-sized cell.
#[no_mangle]
pub unsafe extern "C" fn vmbridge_call(
    metadata: *const u8,
    arguments: *const u8,
    result_slot: *mut *mut c_void,
) {
    if result_slot.is_null() {
        log::warn!("[bridge] call without a result slot ignored");
        return;
    }
    // SAFETY: writable per the contract above.
    unsafe { result_slot.write_unaligned(ptr::null_mut()) };

    let Some(bridge) = BRIDGE.get() else {
        log::warn!("[bridge] call received before a bridge was installed");
        return;
    };

    // SAFETY: buffers are readable up to their declared length.
    let buffers = unsafe { (wire_buffer_from_ptr(metadata), wire_buffer_from_ptr(arguments)) };
    let (Some(metadata), Some(arguments)) = buffers else {
        log::warn!("[bridge] call with a null metadata or argument buffer ignored");
        return;
    };

    if let Some(result) = bridge.invoke(metadata, arguments) {
        // SAFETY: as above.
        unsafe { result_slot.write_unaligned(result.into_handle().into_raw()) };
    }
}

/// Declared byte length of the result in the slot
///
/// Returned as a double: script foreign-call bindings only receive real
/// numbers, and every `u32` is exact in an `f64`. An empty slot yields 0.
///
/// # Safety
/// - `result_slot` must be null or point to a slot filled by
///   [`vmbridge_call`] and not yet released.
#[no_mangle]
pub unsafe extern "C" fn vmbridge_result_size(result_slot: *const *mut c_void) -> f64 {
    // SAFETY: guaranteed by the caller.
    let Some(buffer) = (unsafe { slot_buffer(result_slot) }) else {
        return 0.0;
    };
    f64::from(buffer.size())
}

/// Copy the result in the slot into `dest`
///
/// # Safety
/// - `dest` must be null or point to at least [`vmbridge_result_size`]
///   writable bytes.
/// - `result_slot` as for [`vmbridge_result_size`].
#[no_mangle]
pub unsafe extern "C" fn vmbridge_copy_result(dest: *mut u8, result_slot: *const *mut c_void) {
    if dest.is_null() {
        return;
    }
    // SAFETY: guaranteed by the caller.
    let Some(buffer) = (unsafe { slot_buffer(result_slot) }) else {
        return;
    };
    // SAFETY: the caller provides `size()` writable bytes at `dest`.
    let dest = unsafe { std::slice::from_raw_parts_mut(dest, buffer.size() as usize) };
    buffer.copy_to(dest);
}

/// Free the result in the slot and clear the slot
///
/// Releasing an empty slot is a no-op, so a second release is harmless.
///
/// # Safety
/// - `result_slot` must be null or point to a writable slot filled by
///   [`vmbridge_call`].
#[no_mangle]
pub unsafe extern "C" fn vmbridge_release_result(result_slot: *mut *mut c_void) {
    if result_slot.is_null() {
        return;
    }
    // SAFETY: readable and writable per the contract above.
    let raw = unsafe { result_slot.read_unaligned() };
    // SAFETY: same slot, writable per the contract above.
    unsafe { result_slot.write_unaligned(ptr::null_mut()) };
    // SAFETY: `raw` is null or a live handle stored by `vmbridge_call`; the
    // slot was cleared so it cannot be released twice.
    unsafe { ResultBuffer::release_raw(raw) };
}

unsafe fn slot_buffer<'a>(result_slot: *const *mut c_void) -> Option<&'a ResultBuffer> {
    if result_slot.is_null() {
        return None;
    }
    // SAFETY: readable per the callers' contracts.
    let raw = unsafe { result_slot.read_unaligned() };
    // SAFETY: null or a live handle stored by `vmbridge_call`.
    unsafe { ResultBuffer::from_raw(raw) }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No test in this binary installs a bridge.

    #[test]
    fn test_call_before_install_leaves_slot_empty() {
        let metadata = [4u8, 0, 0, 0];
        let mut slot: *mut c_void = ptr::NonNull::dangling().as_ptr();
        // SAFETY: all pointers are valid.
        unsafe { vmbridge_call(metadata.as_ptr(), metadata.as_ptr(), &mut slot) };
        assert!(slot.is_null());
        assert!(!vmbridge_is_installed());
    }

    #[test]
    fn test_null_pointers_are_noops() {
        // SAFETY: null is an accepted input everywhere.
        unsafe {
            vmbridge_call(ptr::null(), ptr::null(), ptr::null_mut());
            assert_eq!(vmbridge_result_size(ptr::null()), 0.0);
            vmbridge_copy_result(ptr::null_mut(), ptr::null());
            vmbridge_release_result(ptr::null_mut());
        }
        let mut empty: *mut c_void = ptr::null_mut();
        // SAFETY: empty slot.
        unsafe {
            assert_eq!(vmbridge_result_size(&empty), 0.0);
            vmbridge_release_result(&mut empty);
        }
        assert!(empty.is_null());
    }
}
