//! Bridge configuration.
//!
//! ```toml
//! [registry]
//! equivalence = "strict_identity_only"   # or "structural_equivalence"
//! auto_generate = true
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_EQUIVALENCE: &str = "SCHEMA_BRIDGE_EQUIVALENCE";
pub const ENV_AUTO_GENERATE: &str = "SCHEMA_BRIDGE_AUTO_GENERATE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value `{value}` for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

/// How far the registry goes beyond schema identity when matching references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquivalenceMode {
    /// Only the very same schema instance matches.
    StrictIdentityOnly,
    /// Described views and same-field-set objects also match.
    #[default]
    StructuralEquivalence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub equivalence: EquivalenceMode,
    /// Synthesize a class for object schemas nobody registered.
    pub auto_generate: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            equivalence: EquivalenceMode::default(),
            auto_generate: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub registry: RegistryConfig,
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Defaults overlaid with `SCHEMA_BRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(std::env::vars())
    }

    pub fn with_overrides(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        for (key, value) in vars {
            match key.as_str() {
                ENV_EQUIVALENCE => {
                    self.registry.equivalence = match value.to_ascii_lowercase().as_str() {
                        "strict" | "strict_identity_only" => EquivalenceMode::StrictIdentityOnly,
                        "structural" | "structural_equivalence" => EquivalenceMode::StructuralEquivalence,
                        _ => {
                            return Err(ConfigError::InvalidEnv {
                                key: ENV_EQUIVALENCE,
                                value,
                            })
                        }
                    }
                }
                ENV_AUTO_GENERATE => {
                    self.registry.auto_generate = match value.to_ascii_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => {
                            return Err(ConfigError::InvalidEnv {
                                key: ENV_AUTO_GENERATE,
                                value,
                            })
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(self)
    }
}
