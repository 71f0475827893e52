//! # Loading Configuration — Frozen Value and Thawed Builder
//!
//! [`LoadingConfiguration`] is immutable once built and cheap to clone.
//! All changes go through [`LoadingConfigurationBuilder`]:
//!
//! ```text
//! LoadingConfiguration::builder()  ->  builder.register_scheme(..)?
//!                                  ->  builder.freeze()  ->  LoadingConfiguration
//! configuration.thaw()             ->  LoadingConfigurationBuilder (a copy)
//! ```
//!
//! Every setting is validated when it is made, not when it is used: an
//! illegal scheme or a relative redirect fails at the builder call.

use std::collections::HashMap;
use std::sync::Arc;

use jsref_core::{validate_scheme, JsonRef};
use jsref_tree::{node_id, Dereferencing};
use serde_json::Value;

use crate::bundled::BUNDLED_SCHEMAS;
use crate::downloader::{FileDownloader, HttpDownloader, ResourceDownloader, UriDownloader};
use crate::error::ConfigError;

/// Default maximum number of documents kept in the cache.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

#[derive(Debug, Clone)]
struct PathRedirect {
    from: String,
    to: String,
}

#[derive(Debug, Clone)]
struct ConfigInner {
    downloaders: HashMap<String, Arc<dyn UriDownloader>>,
    namespace: JsonRef,
    schema_redirects: HashMap<String, JsonRef>,
    // Longest `from` first.
    path_redirects: Vec<PathRedirect>,
    dereferencing: Dereferencing,
    cache_size: usize,
    preloaded: Vec<(JsonRef, Arc<Value>)>,
}

impl ConfigInner {
    fn bare() -> Self {
        Self {
            downloaders: HashMap::new(),
            namespace: JsonRef::empty(),
            schema_redirects: HashMap::new(),
            path_redirects: Vec::new(),
            dereferencing: Dereferencing::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            preloaded: Vec::new(),
        }
    }
}

/// Immutable loader configuration.
#[derive(Debug, Clone)]
pub struct LoadingConfiguration {
    inner: Arc<ConfigInner>,
}

impl LoadingConfiguration {
    /// A builder starting from the default configuration.
    pub fn builder() -> LoadingConfigurationBuilder {
        LoadingConfigurationBuilder::new()
    }

    /// A mutable copy of this configuration.
    pub fn thaw(&self) -> LoadingConfigurationBuilder {
        LoadingConfigurationBuilder {
            inner: (*self.inner).clone(),
        }
    }

    /// The downloader registered for `scheme`, if any.
    pub fn downloader(&self, scheme: &str) -> Option<&Arc<dyn UriDownloader>> {
        self.inner.downloaders.get(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.inner.downloaders.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// The base every `get` URI is resolved against.
    pub fn namespace(&self) -> &JsonRef {
        &self.inner.namespace
    }

    /// The dereferencing strategy for trees produced by the loader.
    pub fn dereferencing(&self) -> Dereferencing {
        self.inner.dereferencing
    }

    /// Maximum number of cached documents. Zero disables caching.
    pub fn cache_size(&self) -> usize {
        self.inner.cache_size
    }

    /// Documents to place in the cache before any fetch.
    pub fn preloaded(&self) -> &[(JsonRef, Arc<Value>)] {
        &self.inner.preloaded
    }

    /// Where a locator should actually be fetched from.
    ///
    /// The exact schema redirect for the locator applies first. Then the
    /// longest matching path redirect rewrites the result's prefix. The
    /// returned reference has no fragment.
    pub fn redirect(&self, locator: &JsonRef) -> JsonRef {
        let mut target = match self.inner.schema_redirects.get(locator.locator()) {
            Some(to) => to.clone(),
            None => locator.to_locator(),
        };

        let rule = self
            .inner
            .path_redirects
            .iter()
            .find(|rule| target.locator().starts_with(&rule.from));
        if let Some(rule) = rule {
            let rewritten = format!("{}{}", rule.to, &target.locator()[rule.from.len()..]);
            match JsonRef::parse(&rewritten) {
                Ok(reference) => target = reference,
                Err(e) => tracing::warn!(
                    from = %target,
                    rewritten = %rewritten,
                    "path redirect produced an invalid URI, ignoring it: {e}"
                ),
            }
        }
        target
    }
}

impl Default for LoadingConfiguration {
    fn default() -> Self {
        LoadingConfigurationBuilder::new().freeze()
    }
}

/// Mutable counterpart of [`LoadingConfiguration`].
#[derive(Debug, Clone)]
pub struct LoadingConfigurationBuilder {
    inner: ConfigInner,
}

impl LoadingConfigurationBuilder {
    /// The default configuration: `file`, `http`, `https` and `resource`
    /// downloaders, and redirects from each bundled meta-schema's `id` to
    /// its `resource:` copy.
    pub fn new() -> Self {
        let mut inner = ConfigInner::bare();

        let http: Arc<dyn UriDownloader> = Arc::new(HttpDownloader::new());
        inner.downloaders.insert("file".into(), Arc::new(FileDownloader));
        inner.downloaders.insert("http".into(), Arc::clone(&http));
        inner.downloaders.insert("https".into(), http);
        inner
            .downloaders
            .insert("resource".into(), Arc::new(ResourceDownloader::bundled()));

        for schema in BUNDLED_SCHEMAS {
            if let (Ok(from), Ok(to)) = (
                JsonRef::parse(schema.id),
                JsonRef::parse(&schema.resource_uri()),
            ) {
                inner.schema_redirects.insert(from.locator().to_string(), to);
            }
        }

        Self { inner }
    }

    /// A configuration with no downloaders, redirects or preloads.
    pub fn bare() -> Self {
        Self {
            inner: ConfigInner::bare(),
        }
    }

    /// Register `downloader` for `scheme`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::IllegalScheme` if `scheme` is not a valid URI scheme.
    pub fn register_scheme(
        &mut self,
        scheme: &str,
        downloader: Arc<dyn UriDownloader>,
    ) -> Result<&mut Self, ConfigError> {
        validate_scheme(scheme).map_err(|_| ConfigError::IllegalScheme {
            scheme: scheme.to_string(),
        })?;
        self.inner
            .downloaders
            .insert(scheme.to_ascii_lowercase(), downloader);
        Ok(self)
    }

    /// Remove the downloader for `scheme`, if one is registered.
    pub fn unregister_scheme(&mut self, scheme: &str) -> &mut Self {
        self.inner.downloaders.remove(&scheme.to_ascii_lowercase());
        self
    }

    /// Fetch `to` whenever `from` is requested.
    ///
    /// # Errors
    ///
    /// Both must parse as absolute references (absolute locator, empty
    /// fragment) and differ.
    pub fn add_schema_redirect(&mut self, from: &str, to: &str) -> Result<&mut Self, ConfigError> {
        let from = parse_absolute(from)?;
        let to = parse_absolute(to)?;
        if from.contains(&to) {
            return Err(ConfigError::SelfRedirect {
                reference: from.to_string(),
            });
        }
        self.inner
            .schema_redirects
            .insert(from.locator().to_string(), to.to_locator());
        Ok(self)
    }

    /// Rewrite every locator starting with `from` to start with `to` instead.
    ///
    /// # Errors
    ///
    /// Both must be absolute references whose text ends with `/`.
    pub fn add_path_redirect(&mut self, from: &str, to: &str) -> Result<&mut Self, ConfigError> {
        let from = parse_directory(from)?;
        let to = parse_directory(to)?;
        if from == to {
            return Err(ConfigError::SelfRedirect { reference: from });
        }
        self.inner.path_redirects.retain(|rule| rule.from != from);
        self.inner.path_redirects.push(PathRedirect { from, to });
        self.inner
            .path_redirects
            .sort_by(|a, b| b.from.len().cmp(&a.from.len()));
        Ok(self)
    }

    /// Set the base that `get` resolves its argument against.
    ///
    /// # Errors
    ///
    /// `namespace` must be an absolute reference.
    pub fn set_namespace(&mut self, namespace: &str) -> Result<&mut Self, ConfigError> {
        self.inner.namespace = parse_absolute(namespace)?;
        Ok(self)
    }

    /// Choose the dereferencing strategy for loaded trees.
    pub fn set_dereferencing(&mut self, dereferencing: Dereferencing) -> &mut Self {
        self.inner.dereferencing = dereferencing;
        self
    }

    /// Bound the number of cached documents. Zero disables caching.
    pub fn set_cache_size(&mut self, cache_size: usize) -> &mut Self {
        self.inner.cache_size = cache_size;
        self
    }

    /// Preload a schema under the absolute `id` it declares.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotAbsolute` if the document has no `id` or its
    /// `id` is not absolute.
    pub fn preload_schema(&mut self, document: Value) -> Result<&mut Self, ConfigError> {
        let id = node_id(&document).ok_or_else(|| ConfigError::NotAbsolute {
            reference: document
                .get("id")
                .map(ToString::to_string)
                .unwrap_or_else(|| "<missing id>".to_string()),
        })?;
        self.preload_schema_at(&id.to_string(), document)
    }

    /// Preload a schema under an explicit absolute URI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotAbsolute` if `uri` is not absolute.
    pub fn preload_schema_at(
        &mut self,
        uri: &str,
        document: Value,
    ) -> Result<&mut Self, ConfigError> {
        let uri = parse_absolute(uri)?;
        self.inner.preloaded.retain(|(existing, _)| !existing.contains(&uri));
        self.inner.preloaded.push((uri, Arc::new(document)));
        Ok(self)
    }

    /// An immutable snapshot of the current settings.
    pub fn freeze(&self) -> LoadingConfiguration {
        LoadingConfiguration {
            inner: Arc::new(self.inner.clone()),
        }
    }
}

impl Default for LoadingConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_absolute(text: &str) -> Result<JsonRef, ConfigError> {
    let reference = JsonRef::parse(text)?;
    if !reference.is_absolute() {
        return Err(ConfigError::NotAbsolute {
            reference: text.to_string(),
        });
    }
    Ok(reference)
}

fn parse_directory(text: &str) -> Result<String, ConfigError> {
    let reference = parse_absolute(text)?;
    let locator = reference.locator();
    if !locator.ends_with('/') {
        return Err(ConfigError::NotDirectory {
            reference: text.to_string(),
        });
    }
    Ok(locator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn r(s: &str) -> JsonRef {
        JsonRef::parse(s).unwrap()
    }

    #[test]
    fn defaults_register_standard_schemes() {
        let config = LoadingConfiguration::default();
        assert_eq!(config.schemes(), vec!["file", "http", "https", "resource"]);
        assert_eq!(config.cache_size(), DEFAULT_CACHE_SIZE);
        assert_eq!(config.dereferencing(), Dereferencing::Canonical);
        assert_eq!(config.namespace(), &JsonRef::empty());
    }

    #[test]
    fn defaults_redirect_meta_schemas_to_resources() {
        let config = LoadingConfiguration::default();
        assert_eq!(
            config.redirect(&r("http://json-schema.org/draft-04/schema#")),
            r("resource:/draftv4/schema")
        );
        assert_eq!(
            config.redirect(&r("http://json-schema.org/draft-03/schema")),
            r("resource:/draftv3/schema")
        );
    }

    #[test]
    fn bare_has_nothing() {
        let config = LoadingConfigurationBuilder::bare().freeze();
        assert!(config.schemes().is_empty());
        assert_eq!(
            config.redirect(&r("http://json-schema.org/draft-04/schema#")),
            r("http://json-schema.org/draft-04/schema")
        );
    }

    #[test]
    fn illegal_scheme_rejected_at_registration() {
        let mut builder = LoadingConfigurationBuilder::bare();
        let err = builder
            .register_scheme("9bad", Arc::new(FileDownloader))
            .unwrap_err();
        assert!(matches!(err, ConfigError::IllegalScheme { .. }));
    }

    #[test]
    fn schemes_are_case_insensitive() {
        let mut builder = LoadingConfigurationBuilder::bare();
        builder.register_scheme("FOO", Arc::new(FileDownloader)).unwrap();
        let config = builder.freeze();
        assert!(config.downloader("foo").is_some());
        assert!(config.downloader("Foo").is_some());

        let mut thawed = config.thaw();
        thawed.unregister_scheme("foo");
        assert!(thawed.freeze().downloader("foo").is_none());
        assert!(config.downloader("foo").is_some(), "frozen copy is unaffected");
    }

    #[test]
    fn schema_redirect_requires_absolute_endpoints() {
        let mut builder = LoadingConfigurationBuilder::bare();
        assert!(matches!(
            builder.add_schema_redirect("relative.json", "http://x/a").unwrap_err(),
            ConfigError::NotAbsolute { .. }
        ));
        assert!(matches!(
            builder.add_schema_redirect("http://x/a#/frag", "http://x/b").unwrap_err(),
            ConfigError::NotAbsolute { .. }
        ));
        assert!(matches!(
            builder.add_schema_redirect("http://x/a", "http://x/a#").unwrap_err(),
            ConfigError::SelfRedirect { .. }
        ));
    }

    #[test]
    fn schema_redirect_then_path_redirect() {
        let mut builder = LoadingConfigurationBuilder::bare();
        builder
            .add_schema_redirect("http://x/a.json", "http://x/schemas/b.json")
            .unwrap()
            .add_path_redirect("http://x/schemas/", "file:///opt/schemas/")
            .unwrap()
            .add_path_redirect("http://x/", "http://mirror/")
            .unwrap();
        let config = builder.freeze();

        assert_eq!(
            config.redirect(&r("http://x/a.json")),
            r("file:///opt/schemas/b.json")
        );
        assert_eq!(
            config.redirect(&r("http://x/other/c.json")),
            r("http://mirror/other/c.json")
        );
        assert_eq!(config.redirect(&r("http://y/c.json")), r("http://y/c.json"));
    }

    #[test]
    fn path_redirect_requires_directories() {
        let mut builder = LoadingConfigurationBuilder::bare();
        assert!(matches!(
            builder
                .add_path_redirect("http://x/dir", "http://y/dir/")
                .unwrap_err(),
            ConfigError::NotDirectory { .. }
        ));
    }

    #[test]
    fn namespace_must_be_absolute() {
        let mut builder = LoadingConfigurationBuilder::bare();
        assert!(builder.set_namespace("some/dir/").is_err());
        builder.set_namespace("file:///work/").unwrap();
        assert_eq!(builder.freeze().namespace(), &r("file:///work/"));
    }

    #[test]
    fn preload_uses_declared_id() {
        let mut builder = LoadingConfigurationBuilder::bare();
        builder
            .preload_schema(json!({"id": "urn:example:s#", "type": "object"}))
            .unwrap();
        assert!(matches!(
            builder.preload_schema(json!({"type": "object"})).unwrap_err(),
            ConfigError::NotAbsolute { .. }
        ));
        let config = builder.freeze();
        assert_eq!(config.preloaded().len(), 1);
        assert_eq!(config.preloaded()[0].0, r("urn:example:s"));
    }

    #[test]
    fn thaw_freeze_round_trip_preserves_settings() {
        let mut builder = LoadingConfigurationBuilder::new();
        builder
            .set_dereferencing(Dereferencing::Inline)
            .set_cache_size(3);
        let config = builder.freeze().thaw().freeze();
        assert_eq!(config.dereferencing(), Dereferencing::Inline);
        assert_eq!(config.cache_size(), 3);
        assert_eq!(config.schemes().len(), 4);
    }
}
