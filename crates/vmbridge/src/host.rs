// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Startup façade for plugin hosts.
//!
//! Plugins are loaded from data, so the type-level builder/registry split
//! cannot always be threaded through statically. [`BridgeHost`] keeps the
//! lifecycle as runtime state and turns late registration into
//! [`BridgeError::RegistryFrozen`].

use crate::bridge::{call_expression, CallBridge, FunctionTable, NativeFn, NativeFunction};
use crate::codec::{Codec, WireRecord};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{TypeLookup, TypeRegistry, TypeRegistryBuilder};
use crate::script::{finalize_dispatch, ScriptHost, ScriptNames};
use crate::type_id::WireTypeId;
use crate::value::NativeType;
use std::sync::Arc;

enum RegistryState {
    Building(TypeRegistryBuilder),
    Frozen(Arc<TypeRegistry>),
}

/// Registry lifecycle, native targets and config of one bridge.
pub struct BridgeHost {
    config: BridgeConfig,
    state: RegistryState,
    functions: FunctionTable,
}

impl BridgeHost {
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self {
            state: RegistryState::Building(TypeRegistryBuilder::from_config(&config)),
            config,
            functions: FunctionTable::new(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn names(&self) -> ScriptNames {
        ScriptNames::from_config(&self.config)
    }

    fn builder(&mut self, operation: &'static str) -> BridgeResult<&mut TypeRegistryBuilder> {
        match &mut self.state {
            RegistryState::Building(builder) => Ok(builder),
            RegistryState::Frozen(_) => Err(BridgeError::RegistryFrozen { operation }),
        }
    }

    pub fn register_type(&mut self, codec: Codec) -> BridgeResult<WireTypeId> {
        self.builder("register types")?.register(codec)
    }

    pub fn register_record<T: WireRecord>(&mut self) -> BridgeResult<WireTypeId> {
        self.builder("register types")?.register_record::<T>()
    }

    pub fn override_type(&mut self, codec: Codec) -> BridgeResult<WireTypeId> {
        self.builder("override types")?.override_type(codec)
    }

    pub fn is_registered(&self, native_type: &NativeType) -> bool {
        match &self.state {
            RegistryState::Building(builder) => builder.is_registered(native_type),
            RegistryState::Frozen(registry) => registry.is_registered(native_type),
        }
    }

    /// Current type mapping, in either lifecycle stage.
    pub fn types(&self) -> &dyn TypeLookup {
        match &self.state {
            RegistryState::Building(builder) => builder,
            RegistryState::Frozen(registry) => registry.as_ref(),
        }
    }

    /// Register a native target. Targets can be added until the bridge is
    /// built, also after the registry is frozen.
    pub fn register_function<Args, F: NativeFn<Args>>(
        &mut self,
        type_name: &str,
        method_name: &str,
        f: F,
    ) -> BridgeResult<Arc<NativeFunction>> {
        self.functions.register(type_name, method_name, f)
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    /// Script expression calling `function`, see [`call_expression`].
    pub fn call_expression(
        &self,
        function: &NativeFunction,
        expressions: &[&str],
    ) -> BridgeResult<String> {
        call_expression(self.types(), &self.names(), function, expressions)
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, RegistryState::Frozen(_))
    }

    /// Freeze the registry. Idempotent.
    pub fn freeze(&mut self) -> Arc<TypeRegistry> {
        let placeholder = RegistryState::Building(TypeRegistryBuilder::default());
        let registry = match std::mem::replace(&mut self.state, placeholder) {
            RegistryState::Building(builder) => Arc::new(builder.freeze()),
            RegistryState::Frozen(registry) => registry,
        };
        self.state = RegistryState::Frozen(Arc::clone(&registry));
        registry
    }

    pub fn registry(&self) -> Option<&Arc<TypeRegistry>> {
        match &self.state {
            RegistryState::Frozen(registry) => Some(registry),
            RegistryState::Building(_) => None,
        }
    }

    /// Freeze and emit the generated script functions through `host`.
    pub fn finalize(&mut self, host: &mut dyn ScriptHost) -> BridgeResult<Arc<TypeRegistry>> {
        let registry = self.freeze();
        finalize_dispatch(&registry, &self.config, host)?;
        Ok(registry)
    }

    /// Freeze and build the native side of the bridge.
    pub fn into_bridge(mut self) -> CallBridge {
        let registry = self.freeze();
        CallBridge::new(registry, self.functions).with_writer_capacity(self.config.writer_capacity)
    }
}
