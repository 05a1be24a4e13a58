// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Static wire constants (tags, flags, the length prefix size) live in
//! [`crate::type_id`]. This module holds the per-bridge parameters that a
//! host may tune, optionally loaded from YAML.
//!
//! # Example YAML
//!
//! ```yaml
//! # vmbridge.yaml
//! pointer_width: 32
//! function_prefix: modbridge
//! native_library: modbridge_native
//! metadata_capacity: 512
//! ```

use crate::error::{BridgeError, BridgeResult};

/// Default prefix of generated script function names.
pub const DEFAULT_FUNCTION_PREFIX: &str = "vmbridge";

/// Default native library name bound by generated script.
pub const DEFAULT_NATIVE_LIBRARY: &str = "vmbridge_c";

/// Default initial size of the script-side metadata buffer.
pub const DEFAULT_METADATA_CAPACITY: usize = 256;

/// Default initial capacity of native-side writers.
pub const DEFAULT_WRITER_CAPACITY: usize = 64;

/// Wire width of the pointer-sized integer.
///
/// Fixed once per registry: both sides must agree on it for the whole
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "config-loaders",
    derive(serde::Deserialize),
    serde(try_from = "u32")
)]
pub enum PointerWidth {
    W32,
    W64,
}

impl PointerWidth {
    /// Width of the running process.
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::W64
        } else {
            Self::W32
        }
    }

    pub const fn bytes(self) -> usize {
        match self {
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }
}

impl Default for PointerWidth {
    fn default() -> Self {
        Self::native()
    }
}

impl TryFrom<u32> for PointerWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Self::W32),
            64 => Ok(Self::W64),
            other => Err(format!("Invalid pointer width: {} (expected 32 or 64)", other)),
        }
    }
}

/// Per-bridge parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-loaders",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct BridgeConfig {
    /// Wire width of `isize` values.
    pub pointer_width: PointerWidth,
    /// Prefix of every generated script function.
    pub function_prefix: String,
    /// Library the generated script binds the entry points from.
    pub native_library: String,
    /// Initial metadata buffer size in generated script.
    pub metadata_capacity: usize,
    /// Initial capacity of native-side result writers.
    pub writer_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pointer_width: PointerWidth::native(),
            function_prefix: DEFAULT_FUNCTION_PREFIX.to_string(),
            native_library: DEFAULT_NATIVE_LIBRARY.to_string(),
            metadata_capacity: DEFAULT_METADATA_CAPACITY,
            writer_capacity: DEFAULT_WRITER_CAPACITY,
        }
    }
}

impl BridgeConfig {
    pub fn with_pointer_width(mut self, width: PointerWidth) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn with_function_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.function_prefix = prefix.into();
        self
    }

    pub fn with_native_library(mut self, library: impl Into<String>) -> Self {
        self.native_library = library.into();
        self
    }

    /// Check values that end up inside generated script source.
    pub fn validate(&self) -> BridgeResult<()> {
        if !is_script_identifier(&self.function_prefix) {
            return Err(BridgeError::Config {
                reason: format!(
                    "function_prefix '{}' is not a valid script identifier",
                    self.function_prefix
                ),
            });
        }
        if self.native_library.is_empty() || self.native_library.contains(['"', '\\', '\n']) {
            return Err(BridgeError::Config {
                reason: format!("native_library '{}' is not a valid name", self.native_library),
            });
        }
        if self.metadata_capacity < crate::type_id::LENGTH_PREFIX_SIZE {
            return Err(BridgeError::Config {
                reason: format!(
                    "metadata_capacity {} is smaller than the length prefix",
                    self.metadata_capacity
                ),
            });
        }
        Ok(())
    }
}

fn is_script_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// YAML bridge configuration loader.
#[cfg(feature = "config-loaders")]
pub struct ConfigLoader;

#[cfg(feature = "config-loaders")]
impl ConfigLoader {
    /// Load and validate a configuration file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> BridgeResult<BridgeConfig> {
        let path = path.as_ref();
        let yaml_content = std::fs::read_to_string(path).map_err(|e| BridgeError::Config {
            reason: format!("Failed to read YAML file {}: {}", path.display(), e),
        })?;
        Self::parse_yaml(&yaml_content)
    }

    /// Parse and validate YAML content. Missing keys take their defaults.
    pub fn parse_yaml(yaml_content: &str) -> BridgeResult<BridgeConfig> {
        // serde_yaml rejects an empty document for a struct
        if yaml_content.trim().is_empty() {
            return Ok(BridgeConfig::default());
        }
        let config: BridgeConfig =
            serde_yaml::from_str(yaml_content).map_err(|e| BridgeError::Config {
                reason: format!("Failed to parse YAML: {}", e),
            })?;
        config.validate()?;
        log::debug!(
            "[config] loaded bridge config (prefix={}, pointer_width={})",
            config.function_prefix,
            config.pointer_width.bits()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.function_prefix, "vmbridge");
        assert_eq!(config.native_library, "vmbridge_c");
        assert_eq!(config.metadata_capacity, 256);
        assert_eq!(config.pointer_width, PointerWidth::native());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pointer_width_from_bits() {
        assert_eq!(PointerWidth::try_from(32), Ok(PointerWidth::W32));
        assert_eq!(PointerWidth::try_from(64), Ok(PointerWidth::W64));
        assert!(PointerWidth::try_from(16).is_err());
        assert_eq!(PointerWidth::W32.bytes(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        for prefix in ["", "9lives", "has space", "dash-ed"] {
            let config = BridgeConfig::default().with_function_prefix(prefix);
            assert!(
                matches!(config.validate(), Err(BridgeError::Config { .. })),
                "prefix {:?} should be rejected",
                prefix
            );
        }
        assert!(BridgeConfig::default()
            .with_function_prefix("_mods2")
            .validate()
            .is_ok());
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
pointer_width: 32
function_prefix: modbridge
"#;
        let config = ConfigLoader::parse_yaml(yaml).expect("valid YAML should parse");
        assert_eq!(config.pointer_width, PointerWidth::W32);
        assert_eq!(config.function_prefix, "modbridge");
        assert_eq!(config.native_library, DEFAULT_NATIVE_LIBRARY);
        assert_eq!(config.writer_capacity, DEFAULT_WRITER_CAPACITY);
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_parse_empty_document() {
        let config = ConfigLoader::parse_yaml("").expect("empty YAML uses defaults");
        assert_eq!(config, BridgeConfig::default());
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_parse_invalid_pointer_width() {
        let err = ConfigLoader::parse_yaml("pointer_width: 48\n").unwrap_err();
        assert!(matches!(err, BridgeError::Config { .. }));
        assert!(err.to_string().contains("pointer width"));
    }

    #[cfg(feature = "config-loaders")]
    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!(ConfigLoader::parse_yaml("pointer_size: 64\n").is_err());
    }
}
