// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Script call expressions.

use super::functions::NativeFunction;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::TypeLookup;
use crate::script::ScriptNames;

/// Script expression calling `function` through the shared call entry.
///
/// `expressions` holds one script expression per parameter, in order. The
/// result reads
/// `<prefix>_call("Type", "method", <return id>, <n>, <id 1>, <expr 1>, ...)`.
pub fn call_expression(
    types: &dyn TypeLookup,
    names: &ScriptNames,
    function: &NativeFunction,
    expressions: &[&str],
) -> BridgeResult<String> {
    let signature = function.signature();
    if expressions.len() != signature.params.len() {
        return Err(BridgeError::ArityMismatch {
            expected: signature.params.len(),
            found: expressions.len(),
        });
    }

    let return_id = types.type_id_of(&signature.return_type)?;
    let mut out = format!(
        "{}({}, {}, {}, {}",
        names.call(),
        quote(&signature.type_name),
        quote(&signature.method_name),
        return_id.raw(),
        expressions.len()
    );
    for (param, expression) in signature.params.iter().zip(expressions) {
        let id = types.type_id_of(param)?;
        out.push_str(&format!(", {}, {}", id.raw(), expression));
    }
    out.push(')');
    Ok(out)
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
