// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Result buffers handed across the call boundary.
//!
//! The native side allocates a [`ResultBuffer`] and turns it into a raw
//! pointer stored in the caller's result slot. The caller queries its size,
//! copies it out and releases it through the entry points; all pointer work
//! is confined to this module.

use std::ffi::c_void;
use std::ptr::NonNull;

use crate::type_id::LENGTH_PREFIX_SIZE;

/// A finalized wire buffer owned by the native side until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBuffer {
    bytes: Box<[u8]>,
}

impl ResultBuffer {
    /// Wrap a finalized (length-prefixed) buffer.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size reported to the caller: the declared length of the buffer.
    pub fn size(&self) -> u32 {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        match self.bytes.get(..LENGTH_PREFIX_SIZE) {
            Some(head) => {
                prefix.copy_from_slice(head);
                u32::from_le_bytes(prefix)
            }
            None => 0,
        }
    }

    /// Copy into `dest`, at most `dest.len()` bytes. Returns the count.
    pub fn copy_to(&self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.bytes.len()).min(self.size() as usize);
        dest[..n].copy_from_slice(&self.bytes[..n]);
        n
    }

    /// Leak into an opaque handle.
    pub fn into_handle(self) -> ResultHandle {
        ResultHandle(NonNull::from(Box::leak(Box::new(self))).cast())
    }

    /// Borrow the buffer behind a raw slot value.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a pointer produced by [`ResultHandle::into_raw`]
    /// that has not been released yet.
    pub unsafe fn from_raw<'a>(raw: *const c_void) -> Option<&'a ResultBuffer> {
        // SAFETY: guaranteed by the caller.
        unsafe { raw.cast::<ResultBuffer>().as_ref() }
    }

    /// Free the buffer behind a raw slot value. Null is a no-op.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a pointer produced by [`ResultHandle::into_raw`]
    /// that has not been released yet. It must not be used afterwards.
    pub unsafe fn release_raw(raw: *mut c_void) {
        if raw.is_null() {
            return;
        }
        // SAFETY: `raw` came from `Box::leak` in `into_handle` and is
        // released at most once per the contract above.
        drop(unsafe { Box::from_raw(raw.cast::<ResultBuffer>()) });
    }
}

/// Opaque handle to a leaked [`ResultBuffer`].
///
/// Not `Clone`: releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct ResultHandle(NonNull<c_void>);

// SAFETY: the handle owns a heap buffer that is not shared.
unsafe impl Send for ResultHandle {}

impl ResultHandle {
    pub fn into_raw(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Wrap a raw slot value. Null yields `None`.
    ///
    /// # Safety
    ///
    /// `raw` must be null or the address of a live result buffer, as stored
    /// in the result slot by the call entry point.
    pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// View a length-prefixed buffer given only its address.
///
/// The slice covers the declared length; a declared length below the prefix
/// size yields just the prefix, which the reader then rejects.
///
/// # Safety
///
/// `ptr` must be null or point to at least `max(declared length, 4)`
/// readable bytes that stay valid and unmodified for `'a`.
pub unsafe fn wire_buffer_from_ptr<'a>(ptr: *const u8) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the caller guarantees at least the prefix is readable.
    let declared = unsafe { ptr.cast::<[u8; LENGTH_PREFIX_SIZE]>().read_unaligned() };
    let len = (u32::from_le_bytes(declared) as usize).max(LENGTH_PREFIX_SIZE);
    // SAFETY: the caller guarantees `len` readable bytes.
    Some(unsafe { std::slice::from_raw_parts(ptr, len) })
}
