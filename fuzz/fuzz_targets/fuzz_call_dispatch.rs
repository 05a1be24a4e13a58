// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, OnceLock};
use vmbridge::{BridgeError, CallBridge, ErrorSink, FunctionTable, TypeRegistryBuilder};

struct Discard;

impl ErrorSink for Discard {
    fn report(&self, _: &BridgeError) {}
}

fn bridge() -> &'static CallBridge {
    static BRIDGE: OnceLock<CallBridge> = OnceLock::new();
    BRIDGE.get_or_init(|| {
        let mut functions = FunctionTable::new();
        let _ = functions.register("Text", "len", |s: String| s.len() as i32);
        let _ = functions.register("Math", "sum", |xs: Vec<f64>| xs.iter().sum::<f64>());
        let registry = Arc::new(TypeRegistryBuilder::new().freeze());
        CallBridge::new(registry, functions).with_sink(Arc::new(Discard))
    })
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the split between metadata and arguments
    let split = usize::from(data[0]) % data.len();
    let (metadata, arguments) = data[1..].split_at(split.min(data.len() - 1));
    let _ = bridge().invoke(metadata, arguments);
});
