// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error sinks for failures on the native side of a call.

use crate::error::BridgeError;
use parking_lot::Mutex;

/// Receives errors that must not cross the call boundary.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &BridgeError);
}

/// Default sink: logs at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: &BridgeError) {
        log::error!("[bridge] {}", error);
    }
}

/// Sink keeping every report, for hosts that surface errors themselves.
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<BridgeError>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the reports so far.
    pub fn reports(&self) -> Vec<BridgeError> {
        self.reports.lock().clone()
    }

    /// Drain the reports.
    pub fn take(&self) -> Vec<BridgeError> {
        std::mem::take(&mut *self.reports.lock())
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, error: &BridgeError) {
        log::debug!("[bridge] recorded: {}", error);
        self.reports.lock().push(error.clone());
    }
}
