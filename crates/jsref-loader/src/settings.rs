//! # Loader Settings File
//!
//! A YAML or JSON document describing a loading configuration:
//!
//! ```yaml
//! namespace: file:///srv/schemas/
//! dereferencing: inline
//! cache_size: 256
//! schema_redirects:
//!   http://example.com/a.json: file:///srv/schemas/a.json
//! path_redirects:
//!   http://example.com/schemas/: file:///srv/schemas/
//! ```
//!
//! Every key is optional. Settings are applied on top of an existing
//! builder, so defaults such as the bundled meta-schema redirects survive.

use std::collections::BTreeMap;
use std::path::Path;

use jsref_tree::Dereferencing;
use serde::{Deserialize, Serialize};

use crate::config::LoadingConfigurationBuilder;
use crate::error::SettingsError;

/// Parsed contents of a settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSettings {
    /// Base for resolving relative URIs passed to the loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Dereferencing strategy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dereferencing: Option<Dereferencing>,
    /// Maximum number of cached documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<usize>,
    /// Exact locator redirects, source to target.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema_redirects: BTreeMap<String, String>,
    /// Locator prefix redirects, source to target.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_redirects: BTreeMap<String, String>,
}

impl LoaderSettings {
    /// Parse YAML settings text.
    pub fn from_yaml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse JSON settings text.
    pub fn from_json_str(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a settings file. A `.json` extension selects JSON, anything
    /// else is read as YAML.
    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Apply these settings to a builder.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Config` for the first setting the builder
    /// rejects. Settings before it have already been applied.
    pub fn apply(&self, builder: &mut LoadingConfigurationBuilder) -> Result<(), SettingsError> {
        if let Some(namespace) = &self.namespace {
            builder.set_namespace(namespace)?;
        }
        if let Some(dereferencing) = self.dereferencing {
            builder.set_dereferencing(dereferencing);
        }
        if let Some(cache_size) = self.cache_size {
            builder.set_cache_size(cache_size);
        }
        for (from, to) in &self.schema_redirects {
            builder.add_schema_redirect(from, to)?;
        }
        for (from, to) in &self.path_redirects {
            builder.add_path_redirect(from, to)?;
        }
        Ok(())
    }
}
