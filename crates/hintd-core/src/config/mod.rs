//! Declarative node and tier configuration.
//!
//! Handles parsing of arbitration configuration files (TOML or JSON) that
//! define control nodes and their priority tiers, and the fail-closed
//! validation that makes malformed registries unrepresentable: every
//! problem listed in [`ConfigError`] is caught before a single node is
//! built.
//!
//! ```toml
//! [[nodes]]
//! name = "cpu-governor"
//! identifier = "cpu0"
//! reset_on_init = true
//!
//! [[nodes.tiers]]
//! name = "interactive"
//!
//! [[nodes.tiers]]
//! name = "default"
//! default = "schedutil"
//! ```


use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::RequestGroup;

/// Configuration parsing and validation errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file")]
    Io(#[source] std::io::Error),

    /// The file extension maps to no supported format.
    #[error("unsupported config format: {path} (expected .toml or .json)")]
    UnsupportedFormat {
        /// The offending path.
        path: String,
    },

    /// TOML syntax or shape error.
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or shape error.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A node declares no priority tiers.
    #[error("node {node} declares no priority tiers")]
    NoTiers {
        /// Node name.
        node: String,
    },

    /// The last tier of a node declares no default value.
    #[error("node {node}: fallback tier {tier} must declare a default value")]
    MissingFallbackDefault {
        /// Node name.
        node: String,
        /// The fallback tier's name.
        tier: String,
    },

    /// A non-final tier declares a default value; it would stay active
    /// forever and mask every tier below it.
    #[error("node {node}: tier {tier} declares a default but is not the fallback tier")]
    MaskingDefault {
        /// Node name.
        node: String,
        /// The offending tier's name.
        tier: String,
    },

    /// Two nodes share a name.
    #[error("duplicate node name: {name}")]
    DuplicateNode {
        /// The duplicated name.
        name: String,
    },

    /// Two tiers of one node share a name.
    #[error("node {node}: duplicate tier name {tier}")]
    DuplicateTier {
        /// Node name.
        node: String,
        /// The duplicated tier name.
        tier: String,
    },
}

/// Top-level arbitration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Control nodes, in registration order.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// One control node: an ordered list of priority tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node name, used by clients when submitting.
    pub name: String,

    /// Opaque identifier handed to the apply sink alongside the name,
    /// typically a path or device handle.
    pub identifier: String,

    /// Apply the computed value on the first arbitration pass even when it
    /// equals the fallback, synchronizing external state at startup.
    #[serde(default)]
    pub reset_on_init: bool,

    /// Priority tiers, highest first. The last tier is the fallback and
    /// must carry a default value.
    pub tiers: Vec<TierConfig>,
}

/// One priority tier of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    /// Tier name, unique within its node.
    pub name: String,

    /// Fixed default value. Required on the fallback (last) tier, rejected
    /// on any other.
    #[serde(default)]
    pub default: Option<String>,
}

impl TierConfig {
    /// Builds the runtime request group for this tier.
    #[must_use]
    pub fn build(&self) -> RequestGroup {
        match &self.default {
            Some(value) => RequestGroup::with_default(&self.name, value.clone()),
            None => RequestGroup::new(&self.name),
        }
    }
}

impl ArbiterConfig {
    /// Loads and validates a configuration file, dispatching on extension.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read, the
    /// extension is neither `.toml` nor `.json`, parsing fails, or
    /// validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on parse or validation failure.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] on parse or validation failure.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail-closed structural validation.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: empty tier lists, a fallback tier
    /// without a default, a masking default on a non-final tier, or
    /// duplicate node/tier names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut node_names = HashSet::new();
        for node in &self.nodes {
            if !node_names.insert(node.name.as_str()) {
                return Err(ConfigError::DuplicateNode {
                    name: node.name.clone(),
                });
            }
            let Some(last_index) = node.tiers.len().checked_sub(1) else {
                return Err(ConfigError::NoTiers {
                    node: node.name.clone(),
                });
            };
            let mut tier_names = HashSet::new();
            for (index, tier) in node.tiers.iter().enumerate() {
                if !tier_names.insert(tier.name.as_str()) {
                    return Err(ConfigError::DuplicateTier {
                        node: node.name.clone(),
                        tier: tier.name.clone(),
                    });
                }
                if index == last_index && tier.default.is_none() {
                    return Err(ConfigError::MissingFallbackDefault {
                        node: node.name.clone(),
                        tier: tier.name.clone(),
                    });
                }
                if index != last_index && tier.default.is_some() {
                    return Err(ConfigError::MaskingDefault {
                        node: node.name.clone(),
                        tier: tier.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
