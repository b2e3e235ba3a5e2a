//! Decompressor configuration, loaded from TOML
//!
//! ```toml
//! cycles_per_bit = 32
//! sigcomp_version = 2
//! state_memory_size = 8192
//! state_free = "remove"
//! dictionary_dir = "/usr/share/sigcomp"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// cycles_per_bit values permitted by RFC 3320
pub const VALID_CYCLES_PER_BIT: [u16; 4] = [16, 32, 64, 128];

/// What STATE-FREE does with a matching item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateFreePolicy {
    /// Validate the operands but keep the state
    #[default]
    Ignore,
    /// Remove the matching non-built-in item
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UdvmConfig {
    pub cycles_per_bit: u16,
    pub sigcomp_version: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_memory_size: Option<usize>,
    pub state_free: StateFreePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_dir: Option<PathBuf>,
}

impl Default for UdvmConfig {
    fn default() -> Self {
        UdvmConfig {
            cycles_per_bit: 16,
            sigcomp_version: 1,
            state_memory_size: None,
            state_free: StateFreePolicy::Ignore,
            dictionary_dir: None,
        }
    }
}

impl UdvmConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: UdvmConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_CYCLES_PER_BIT.contains(&self.cycles_per_bit) {
            return Err(ConfigError::new(format!(
                "cycles_per_bit must be one of {:?}, got {}",
                VALID_CYCLES_PER_BIT, self.cycles_per_bit
            )));
        }
        if self.sigcomp_version == 0 {
            return Err(ConfigError::new("sigcomp_version must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = UdvmConfig::from_toml_str("").unwrap();
        assert_eq!(config, UdvmConfig::default());
        assert_eq!(config.cycles_per_bit, 16);
        assert_eq!(config.state_free, StateFreePolicy::Ignore);
    }

    #[test]
    fn test_full_document() {
        let config = UdvmConfig::from_toml_str(
            r#"
            cycles_per_bit = 64
            sigcomp_version = 2
            state_memory_size = 4096
            state_free = "remove"
            dictionary_dir = "dicts"
            "#,
        )
        .unwrap();
        assert_eq!(config.cycles_per_bit, 64);
        assert_eq!(config.sigcomp_version, 2);
        assert_eq!(config.state_memory_size, Some(4096));
        assert_eq!(config.state_free, StateFreePolicy::Remove);
        assert_eq!(config.dictionary_dir, Some(PathBuf::from("dicts")));
    }

    #[test]
    fn test_rejects_invalid_cycles_per_bit() {
        let err = UdvmConfig::from_toml_str("cycles_per_bit = 20").unwrap_err();
        assert!(err.message.contains("cycles_per_bit"));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(UdvmConfig::from_toml_str("cycles = 16").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = UdvmConfig::load("/nonexistent/udvm.toml").unwrap_err();
        assert!(err.message.contains("I/O error"));
    }
}
