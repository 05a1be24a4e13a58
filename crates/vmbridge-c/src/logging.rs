// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging and error reporting for hosts that load the bridge library.
//!
//! The bridge logs under its module paths, so each component can run at its
//! own level: `vmbridge::registry` (registration, override, freeze),
//! `vmbridge::bridge` and `vmbridge_c` (call decoding, dispatch, results),
//! `vmbridge::script` (generated functions). `VMBRIDGE_LOG`, when set,
//! replaces the configured levels with an `env_logger` filter string.
//!
//! Dispatch failures never cross the call boundary. A host that wants to
//! surface them, in a mod console for instance, registers a callback with
//! [`vmbridge_set_error_callback`] and builds its bridge with
//! [`ForeignSink`].

use std::ffi::CString;
use std::os::raw::{c_char, c_void};

use parking_lot::RwLock;
use vmbridge::{BridgeError, ErrorSink, LogSink};

use super::VmBridgeStatus;

/// Environment variable overriding the configured filter.
pub const LOG_ENV: &str = "VMBRIDGE_LOG";

/// Log level for bridge logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmBridgeLogLevel {
    VmBridgeLogOff = 0,
    VmBridgeLogError = 1,
    VmBridgeLogWarn = 2,
    VmBridgeLogInfo = 3,
    VmBridgeLogDebug = 4,
    VmBridgeLogTrace = 5,
}

impl VmBridgeLogLevel {
    fn filter(self) -> log::LevelFilter {
        match self {
            Self::VmBridgeLogOff => log::LevelFilter::Off,
            Self::VmBridgeLogError => log::LevelFilter::Error,
            Self::VmBridgeLogWarn => log::LevelFilter::Warn,
            Self::VmBridgeLogInfo => log::LevelFilter::Info,
            Self::VmBridgeLogDebug => log::LevelFilter::Debug,
            Self::VmBridgeLogTrace => log::LevelFilter::Trace,
        }
    }
}

/// Per-component log levels
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmBridgeLogConfig {
    /// Everything outside the components below
    pub default_level: VmBridgeLogLevel,
    /// Type registration and registry lifecycle
    pub registry: VmBridgeLogLevel,
    /// Call decoding, dispatch and result handles
    pub bridge: VmBridgeLogLevel,
    /// Script function generation
    pub script: VmBridgeLogLevel,
}

impl VmBridgeLogConfig {
    pub const fn uniform(level: VmBridgeLogLevel) -> Self {
        Self {
            default_level: level,
            registry: level,
            bridge: level,
            script: level,
        }
    }

    /// `env_logger` filter string for these levels.
    pub fn filters(&self) -> String {
        let bridge = self.bridge.filter();
        format!(
            "{},vmbridge::registry={},vmbridge::bridge={},vmbridge_c={},vmbridge::script={}",
            self.default_level.filter(),
            self.registry.filter(),
            bridge,
            bridge,
            self.script.filter()
        )
    }
}

fn install_logger(filters: &str) -> VmBridgeStatus {
    let env = env_logger::Env::new().filter_or(LOG_ENV, filters);
    // Messages carry their own component prefix
    match env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(false)
        .try_init()
    {
        Ok(()) => VmBridgeStatus::VmBridgeOk,
        Err(_) => VmBridgeStatus::VmBridgeOperationFailed,
    }
}

/// Log every component at `level`
///
/// # Returns
/// `VmBridgeOk` on success, `VmBridgeOperationFailed` if a logger is
/// already installed
///
/// # Example (C)
/// ```c
/// vmbridge_logging_init(VM_BRIDGE_LOG_INFO);
/// ```
#[no_mangle]
pub extern "C" fn vmbridge_logging_init(level: VmBridgeLogLevel) -> VmBridgeStatus {
    install_logger(&VmBridgeLogConfig::uniform(level).filters())
}

/// Log with one level per component
///
/// # Safety
/// - `config` must be null or point to a valid `VmBridgeLogConfig`.
///
/// # Example (C)
/// ```c
/// VmBridgeLogConfig config = {
///     VM_BRIDGE_LOG_WARN, VM_BRIDGE_LOG_INFO, VM_BRIDGE_LOG_DEBUG, VM_BRIDGE_LOG_OFF,
/// };
/// vmbridge_logging_init_with_config(&config);
/// ```
#[no_mangle]
pub unsafe extern "C" fn vmbridge_logging_init_with_config(
    config: *const VmBridgeLogConfig,
) -> VmBridgeStatus {
    // SAFETY: null or valid per the contract above.
    let Some(config) = (unsafe { config.as_ref() }) else {
        return VmBridgeStatus::VmBridgeInvalidArgument;
    };
    install_logger(&config.filters())
}

/// Receives one dispatch failure as a NUL-terminated UTF-8 message, valid
/// for the duration of the call.
pub type VmBridgeErrorCallback = extern "C" fn(message: *const c_char, user_data: *mut c_void);

struct ErrorCallback {
    callback: VmBridgeErrorCallback,
    user_data: *mut c_void,
}

// SAFETY: `user_data` is never dereferenced here, only handed back to the
// host's callback, which accepts it from any thread that runs a call.
unsafe impl Send for ErrorCallback {}
unsafe impl Sync for ErrorCallback {}

static ERROR_CALLBACK: RwLock<Option<ErrorCallback>> = parking_lot::const_rwlock(None);

/// Set or clear (`callback` = NULL) the error callback used by
/// [`ForeignSink`]
///
/// # Safety
/// - `callback` must stay callable, and `user_data` valid for it, until the
///   callback is replaced or cleared.
#[no_mangle]
pub unsafe extern "C" fn vmbridge_set_error_callback(
    callback: Option<VmBridgeErrorCallback>,
    user_data: *mut c_void,
) -> VmBridgeStatus {
    *ERROR_CALLBACK.write() = callback.map(|callback| ErrorCallback {
        callback,
        user_data,
    });
    VmBridgeStatus::VmBridgeOk
}

/// Error sink that logs each report and forwards it to the callback set with
/// [`vmbridge_set_error_callback`], if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForeignSink;

impl ErrorSink for ForeignSink {
    fn report(&self, error: &BridgeError) {
        LogSink.report(error);

        let guard = ERROR_CALLBACK.read();
        let Some(registered) = guard.as_ref() else {
            return;
        };
        let Ok(message) = CString::new(error.to_string().replace('\0', " ")) else {
            return;
        };
        (registered.callback)(message.as_ptr(), registered.user_data);
    }
}
