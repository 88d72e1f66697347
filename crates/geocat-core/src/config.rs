//! Configuration types for geocat.
//!
//! [`Config::load`] layers, lowest first: the embedded defaults below, an
//! optional TOML file (`$XDG_CONFIG_HOME/geocat/config.toml` unless a path is
//! given), then `GEOCAT__SECTION__KEY` environment variables.
//! [`Config::defaults`] returns the embedded defaults alone (useful in tests).
//!
//! The search pipeline never reads [`Config`] directly; it is handed an
//! immutable [`SearchSettings`] and a [`FieldRegistry`] built from it.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::Capability;
use crate::registry::{FieldDescriptor, FieldRegistry};
use crate::types::FieldType;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[search]
title            = "geocat"
description      = "Catalog search with keyset pagination"
base_url         = "http://127.0.0.1:8080"
default_limit    = 10
max_limit        = 10000
default_includes = ["id", "type", "geometry", "bbox", "links", "assets", "properties.datetime"]

[capabilities]
context = true
fields  = true
sort    = true
query   = true

[server]
bind = "127.0.0.1:8080"
"#;

const ENV_PREFIX: &str = "GEOCAT";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub server: ServerConfig,
    /// Extra queryable properties on top of the built-in table.
    #[serde(default)]
    pub queryables: Vec<QueryableConfig>,
}

/// `[search]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Shown on the landing page.
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Public root used in pagination links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
    /// Fields every projected record keeps.
    #[serde(default = "default_includes")]
    pub default_includes: Vec<String>,
}

fn default_title() -> String { "geocat".to_string() }
fn default_base_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_limit() -> u64 { 10 }
fn default_max_limit() -> u64 { 10_000 }
fn default_includes() -> Vec<String> {
    ["id", "type", "geometry", "bbox", "links", "assets", "properties.datetime"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: String::new(),
            base_url: default_base_url(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            default_includes: default_includes(),
        }
    }
}

/// `[capabilities]` section of `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Capabilities {
    #[serde(default = "enabled")]
    pub context: bool,
    #[serde(default = "enabled")]
    pub fields: bool,
    #[serde(default = "enabled")]
    pub sort: bool,
    #[serde(default = "enabled")]
    pub query: bool,
}

fn enabled() -> bool { true }

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            context: true,
            fields: true,
            sort: true,
            query: true,
        }
    }
}

impl Capabilities {
    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::Context => self.context,
            Capability::Fields => self.fields,
            Capability::Sort => self.sort,
            Capability::Query => self.query,
        }
    }
}

/// `[server]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

/// One `[[queryables]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryableConfig {
    pub name: String,
    /// Storage path; `properties.<name>` when omitted.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("default_limit {default_limit} must be between 1 and max_limit {max_limit}")]
    InvalidLimits { default_limit: u64, max_limit: u64 },

    #[error("queryable '{name}': {reason}")]
    InvalidQueryable { name: String, reason: String },
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load the layered configuration. An explicit `path` must exist; the
    /// default location is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let env = config::Environment::with_prefix(ENV_PREFIX);
        Self::layered(path, env)
    }

    fn layered(path: Option<&Path>, env: config::Environment) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::from(config_path().as_path()).required(false),
        };

        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(file)
            .add_source(
                env.prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search.default_includes"),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// Built-in queryables plus the configured ones.
    pub fn registry(&self) -> Result<FieldRegistry, ConfigError> {
        let mut registry = FieldRegistry::builtin();
        for q in &self.queryables {
            let invalid = |reason: &str| ConfigError::InvalidQueryable {
                name: q.name.clone(),
                reason: reason.to_string(),
            };
            let descriptor = match &q.path {
                None => FieldDescriptor::property(&q.name, q.ty),
                Some(path) if path.starts_with("properties.") && path.len() > "properties.".len() => {
                    FieldDescriptor::new(&q.name, path, q.ty)
                }
                Some(_) => return Err(invalid("path must address a key under 'properties.'")),
            };
            if !registry.register(descriptor) {
                return Err(invalid("core fields cannot be redefined"));
            }
        }
        Ok(registry)
    }

    pub fn settings(&self) -> Result<SearchSettings, ConfigError> {
        SearchSettings::from_config(self)
    }
}

// ---------------------------------------------------------------------------
// Runtime settings
// ---------------------------------------------------------------------------

/// Immutable settings the search pipeline runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub title: String,
    pub description: String,
    pub base_url: String,
    pub default_limit: u64,
    pub max_limit: u64,
    pub default_includes: BTreeSet<String>,
    pub capabilities: Capabilities,
}

impl SearchSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let search = &config.search;
        if search.max_limit == 0 || search.default_limit == 0 || search.default_limit > search.max_limit {
            return Err(ConfigError::InvalidLimits {
                default_limit: search.default_limit,
                max_limit: search.max_limit,
            });
        }
        Ok(Self {
            title: search.title.clone(),
            description: search.description.clone(),
            base_url: search.base_url.trim_end_matches('/').to_string(),
            default_limit: search.default_limit,
            max_limit: search.max_limit,
            default_includes: search.default_includes.iter().cloned().collect(),
            capabilities: config.capabilities,
        })
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&Config::defaults()).expect("built-in default limits must be valid")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("geocat")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
