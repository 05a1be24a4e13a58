// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use vmbridge::{TypeRegistryBuilder, WireReader, WireTypeId};

fuzz_target!(|data: &[u8]| {
    let registry = TypeRegistryBuilder::new().freeze();
    let Ok(mut reader) = WireReader::bind(&registry, data) else {
        return;
    };

    // Each id read in turn until the buffer is exhausted or rejected
    let ids = [
        WireTypeId::U8,
        WireTypeId::STRING,
        WireTypeId::I32.array(),
        WireTypeId::F64,
        WireTypeId::CHAR,
        WireTypeId::STRING.array(),
        WireTypeId::INT_PTR,
        WireTypeId::BOOL,
    ];
    for id in ids.iter().cycle().take(64) {
        if reader.read(*id).is_err() {
            break;
        }
    }
});
