// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native call targets.
//!
//! Targets are free functions grouped under a type name, keyed by
//! `(type name, method name)` and resolved by exact parameter list. There is
//! no receiver, so every target is callable without an instance.

use crate::error::{BridgeError, BridgeResult};
use crate::value::{NativeType, NativeValue, WireValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name and exact types of a native target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeSignature {
    pub type_name: String,
    pub method_name: String,
    pub params: Vec<NativeType>,
    pub return_type: NativeType,
}

impl NativeSignature {
    pub fn new(
        type_name: impl Into<String>,
        method_name: impl Into<String>,
        params: Vec<NativeType>,
        return_type: NativeType,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: method_name.into(),
            params,
            return_type,
        }
    }
}

impl fmt::Display for NativeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}(", self.type_name, self.method_name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

type RawFn = dyn Fn(Vec<WireValue>) -> BridgeResult<WireValue> + Send + Sync;

/// A registered target.
pub struct NativeFunction {
    signature: NativeSignature,
    call: Box<RawFn>,
}

impl NativeFunction {
    pub fn signature(&self) -> &NativeSignature {
        &self.signature
    }

    /// Invoke with already-decoded arguments.
    pub fn call(&self, args: Vec<WireValue>) -> BridgeResult<WireValue> {
        if args.len() != self.signature.params.len() {
            return Err(BridgeError::ArityMismatch {
                expected: self.signature.params.len(),
                found: args.len(),
            });
        }
        (self.call)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Rust callables usable as targets, with their types known statically.
///
/// Implemented for `Fn(A, B, ..) -> R` up to six parameters where every
/// parameter and the return type implement [`NativeValue`].
pub trait NativeFn<Args>: Send + Sync + 'static {
    fn param_types() -> Vec<NativeType>;
    fn return_type() -> NativeType;
    fn invoke(&self, args: Vec<WireValue>) -> BridgeResult<WireValue>;
}

macro_rules! impl_native_fn {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> NativeFn<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: NativeValue,
            $($arg: NativeValue,)*
        {
            fn param_types() -> Vec<NativeType> {
                vec![$(<$arg as NativeValue>::native_type()),*]
            }

            fn return_type() -> NativeType {
                Ret::native_type()
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, args: Vec<WireValue>) -> BridgeResult<WireValue> {
                let expected = <Self as NativeFn<($($arg,)*)>>::param_types().len();
                if args.len() != expected {
                    return Err(BridgeError::ArityMismatch {
                        expected,
                        found: args.len(),
                    });
                }
                let mut args = args.into_iter();
                $(
                    let $arg = <$arg as NativeValue>::from_wire(args.next().ok_or(
                        BridgeError::ArityMismatch { expected, found: 0 },
                    )?)?;
                )*
                Ok((self)($($arg),*).into_wire())
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A);
impl_native_fn!(A, B);
impl_native_fn!(A, B, C);
impl_native_fn!(A, B, C, D);
impl_native_fn!(A, B, C, D, E);
impl_native_fn!(A, B, C, D, E, F);

/// Targets keyed by `(type name, method name)`; overloads differ by
/// parameter list.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<(String, String), Vec<Arc<NativeFunction>>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed Rust callable.
    ///
    /// ```
    /// use vmbridge::FunctionTable;
    ///
    /// let mut table = FunctionTable::new();
    /// table.register("Math", "add", |a: i32, b: i32| a + b).unwrap();
    /// ```
    pub fn register<Args, F: NativeFn<Args>>(
        &mut self,
        type_name: &str,
        method_name: &str,
        f: F,
    ) -> BridgeResult<Arc<NativeFunction>> {
        let signature = NativeSignature::new(
            type_name,
            method_name,
            F::param_types(),
            F::return_type(),
        );
        self.insert(NativeFunction {
            signature,
            call: Box::new(move |args| f.invoke(args)),
        })
    }

    /// Register a dynamically typed target. Arguments arrive already checked
    /// against `signature.params`.
    pub fn register_raw<F>(
        &mut self,
        signature: NativeSignature,
        f: F,
    ) -> BridgeResult<Arc<NativeFunction>>
    where
        F: Fn(Vec<WireValue>) -> BridgeResult<WireValue> + Send + Sync + 'static,
    {
        self.insert(NativeFunction {
            signature,
            call: Box::new(f),
        })
    }

    fn insert(&mut self, function: NativeFunction) -> BridgeResult<Arc<NativeFunction>> {
        let signature = &function.signature;
        if let Some(nested) = signature
            .params
            .iter()
            .find(|p| p.element().is_some_and(NativeType::is_array))
        {
            return Err(BridgeError::ArrayTypeRejected {
                native_type: nested.clone(),
            });
        }
        let key = (signature.type_name.clone(), signature.method_name.clone());
        let overloads = self.functions.entry(key).or_default();
        if overloads
            .iter()
            .any(|existing| existing.signature.params == signature.params)
        {
            return Err(BridgeError::InvalidValue {
                reason: format!("{} is already registered", signature),
            });
        }

        log::debug!("[bridge] registered target {}", signature);
        let function = Arc::new(function);
        overloads.push(Arc::clone(&function));
        Ok(function)
    }

    /// Exact resolution: same names, same parameter list.
    pub fn resolve(
        &self,
        type_name: &str,
        method_name: &str,
        params: &[NativeType],
    ) -> BridgeResult<&Arc<NativeFunction>> {
        self.functions
            .get(&(type_name.to_string(), method_name.to_string()))
            .and_then(|overloads| overloads.iter().find(|f| f.signature.params == params))
            .ok_or_else(|| BridgeError::MissingTarget {
                type_name: type_name.to_string(),
                method_name: method_name.to_string(),
                params: params.to_vec(),
            })
    }

    /// Number of registered targets, overloads counted separately.
    pub fn len(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NativeFunction>> {
        self.functions.values().flatten()
    }
}
