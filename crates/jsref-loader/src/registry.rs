//! # Schema Loader — URI to Tree
//!
//! `SchemaLoader` is the registry: it owns a frozen configuration and a
//! document cache, and turns URIs into [`SchemaTree`]s.
//!
//! ## Pipeline for `get(uri)`
//!
//! 1. Resolve `uri` against the configured namespace.
//! 2. Reject anything that is not absolute (absolute locator, empty fragment).
//! 3. Apply the schema redirect, then the path redirect.
//! 4. Look up the redirect target in the cache; on a miss fetch it through
//!    the downloader for its scheme and parse it as JSON.
//! 5. Wrap the document in a tree whose loading reference is the
//!    *requested* locator, using the configured dereferencing strategy.
//!
//! Documents are cached under the redirect target, so `get(A)` and `get(B)`
//! share one entry when `A` redirects to `B`.

use std::sync::Arc;

use jsref_core::{canonical_eq, JsonRef, RefError};
use jsref_tree::SchemaTree;
use serde_json::Value;

use crate::cache::DocumentCache;
use crate::config::LoadingConfiguration;
use crate::error::LoadError;

/// Fetches, caches and wraps schema documents.
#[derive(Debug)]
pub struct SchemaLoader {
    config: LoadingConfiguration,
    cache: DocumentCache,
}

impl SchemaLoader {
    /// A loader over `config`. Preloaded schemas are pinned in the cache.
    pub fn new(config: LoadingConfiguration) -> Self {
        let cache = DocumentCache::new(config.cache_size());
        for (uri, document) in config.preloaded() {
            let target = config.redirect(uri);
            cache.pin(target.locator(), Arc::clone(document));
        }
        Self { config, cache }
    }

    /// A loader over the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LoadingConfiguration::default())
    }

    /// The configuration this loader was built with.
    pub fn configuration(&self) -> &LoadingConfiguration {
        &self.config
    }

    /// The document cache.
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Wrap an in-memory document. Its loading reference is empty.
    pub fn load(&self, document: impl Into<Arc<Value>>) -> SchemaTree {
        SchemaTree::new(JsonRef::empty(), document, self.config.dereferencing())
    }

    /// Load the document at `uri`.
    ///
    /// # Errors
    ///
    /// See [`SchemaLoader::get_ref`]. Additionally `LoadError::IllegalScheme`
    /// or `LoadError::Reference` if `uri` does not parse.
    pub fn get(&self, uri: &str) -> Result<SchemaTree, LoadError> {
        let reference = JsonRef::parse(uri).map_err(|e| match e {
            RefError::IllegalScheme { scheme } => LoadError::IllegalScheme { scheme },
            other => LoadError::Reference(other),
        })?;
        self.get_ref(&reference)
    }

    /// Load the document a reference names.
    ///
    /// # Errors
    ///
    /// - `LoadError::NotAbsolute` if the reference, resolved against the
    ///   namespace, has a relative locator or a non-empty fragment.
    /// - `LoadError::UnhandledScheme` if no downloader serves its scheme.
    /// - `LoadError::Download` if the downloader fails.
    /// - `LoadError::NotJson` if the bytes do not parse.
    pub fn get_ref(&self, reference: &JsonRef) -> Result<SchemaTree, LoadError> {
        let requested = self.config.namespace().resolve(reference);
        if !requested.is_absolute() {
            return Err(LoadError::NotAbsolute {
                reference: requested.to_string(),
            });
        }
        let requested = requested.to_locator();

        let document = self.document(&requested)?;
        Ok(SchemaTree::new(
            requested,
            document,
            self.config.dereferencing(),
        ))
    }

    /// The cache key for an absolute locator: its redirect target.
    ///
    /// Two locators name the same loaded document exactly when their cache
    /// keys are equal.
    pub fn cache_key(&self, locator: &JsonRef) -> String {
        self.config.redirect(&locator.to_locator()).locator().to_string()
    }

    /// Place already parsed documents in the cache, bypassing downloaders.
    ///
    /// Bundled documents are pinned: they cannot be refetched, so they are
    /// never evicted.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotAbsolute` for the first non-absolute key.
    /// Documents before it have already been added.
    pub fn add_bundle<I>(&self, documents: I) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = (JsonRef, Value)>,
    {
        for (uri, document) in documents {
            if !uri.is_absolute() {
                return Err(LoadError::NotAbsolute {
                    reference: uri.to_string(),
                });
            }
            let target = self.config.redirect(&uri);
            let document = Arc::new(document);
            if let Some(previous) = self.cache.pin(target.locator(), Arc::clone(&document)) {
                if !canonical_eq(&previous, &document) {
                    tracing::warn!(uri = %target, "bundle replaced a different cached document");
                }
            }
        }
        Ok(())
    }

    fn document(&self, requested: &JsonRef) -> Result<Arc<Value>, LoadError> {
        let target = self.config.redirect(requested);
        if &target != requested {
            tracing::debug!(from = %requested, to = %target, "redirected schema URI");
        }
        self.cache
            .get_or_try_insert_with(target.locator(), || self.fetch(&target))
    }

    fn fetch(&self, target: &JsonRef) -> Result<Value, LoadError> {
        let scheme = target.uri().scheme().unwrap_or_default();
        let downloader =
            self.config
                .downloader(scheme)
                .ok_or_else(|| LoadError::UnhandledScheme {
                    scheme: scheme.to_string(),
                    uri: target.to_string(),
                })?;

        tracing::debug!(uri = %target, "fetching schema document");
        let bytes = downloader
            .fetch(target)
            .map_err(|source| LoadError::Download {
                uri: target.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| LoadError::NotJson {
            uri: target.to_string(),
            source,
        })
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::with_defaults()
    }
}
