//! # Loader Error Types
//!
//! One enum per concern, following the same layering as the rest of the
//! workspace:
//!
//! - [`DownloadError`]: a downloader could not produce bytes.
//! - [`LoadError`]: the registry could not produce a tree for a URI.
//! - [`ConfigError`]: a configuration builder rejected a setting.
//! - [`ResolveError`]: a `$ref` chain could not be followed.
//! - [`SettingsError`]: a settings file could not be read or applied.
//!
//! Lookup misses are never errors. `SchemaTree::locate` returning `None`
//! becomes [`ResolveError::Unresolvable`] only when a `$ref` demanded it.

use std::path::PathBuf;

use jsref_core::{JsonPointer, JsonRef, RefError};
use thiserror::Error;

/// A downloader failed to fetch the bytes behind a URI.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connection refused, timeout, TLS).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// Numeric status code.
        status: u16,
    },

    /// No such resource exists under this URI.
    #[error("no resource at '{location}'")]
    NotFound {
        /// What was looked up.
        location: String,
    },

    /// The URI cannot be mapped to anything this downloader can read.
    #[error("cannot map '{uri}' to a location: {reason}")]
    InvalidLocation {
        /// The offending URI.
        uri: String,
        /// Why it could not be mapped.
        reason: String,
    },

    /// Failure reported by a caller-supplied downloader.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// The registry could not produce a tree for a URI.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The URI, after resolution against the namespace, is not absolute.
    #[error("'{reference}' is not an absolute reference")]
    NotAbsolute {
        /// The reference after namespace resolution.
        reference: String,
    },

    /// No downloader is registered for the URI's scheme.
    #[error("no downloader registered for scheme '{scheme}' (uri '{uri}')")]
    UnhandledScheme {
        /// The unhandled scheme.
        scheme: String,
        /// The URI that needed it.
        uri: String,
    },

    /// The downloader failed.
    #[error("failed to fetch '{uri}': {source}")]
    Download {
        /// URI that was fetched (after redirects).
        uri: String,
        /// Underlying downloader error.
        #[source]
        source: DownloadError,
    },

    /// The fetched bytes are not a JSON document.
    #[error("content of '{uri}' is not JSON: {source}")]
    NotJson {
        /// URI that was fetched (after redirects).
        uri: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The URI carries a syntactically illegal scheme.
    #[error("illegal URI scheme '{scheme}'")]
    IllegalScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// The URI text could not be parsed.
    #[error("invalid reference: {0}")]
    Reference(#[from] RefError),
}

/// A configuration builder rejected a setting.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A scheme name does not follow URI scheme syntax.
    #[error("illegal URI scheme '{scheme}'")]
    IllegalScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// A redirect endpoint or namespace is not an absolute reference.
    #[error("'{reference}' must be an absolute reference")]
    NotAbsolute {
        /// The rejected reference.
        reference: String,
    },

    /// A path redirect endpoint does not denote a directory.
    #[error("path redirect endpoint '{reference}' must end with '/'")]
    NotDirectory {
        /// The rejected reference.
        reference: String,
    },

    /// A redirect whose source and target are the same locator.
    #[error("cannot redirect '{reference}' to itself")]
    SelfRedirect {
        /// The rejected reference.
        reference: String,
    },

    /// Text could not be parsed as a reference.
    #[error("invalid reference: {0}")]
    Reference(#[from] RefError),
}

/// A `$ref` chain could not be followed to a concrete node.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The chain revisited a reference it had already followed.
    #[error("$ref loop detected: {}", display_chain(.chain))]
    RefLoop {
        /// Every reference followed, ending with the repeated one.
        chain: Vec<JsonRef>,
    },

    /// A `$ref` target does not exist in the document that should hold it.
    #[error("unresolvable $ref '{reference}' at '{site}'")]
    Unresolvable {
        /// The absolute target.
        reference: JsonRef,
        /// Where the `$ref` was found.
        site: JsonRef,
    },

    /// The chain grew longer than the configured bound.
    #[error("$ref chain exceeded {max_depth} hops at '{reference}'")]
    DepthExceeded {
        /// The configured bound.
        max_depth: usize,
        /// The reference that would have exceeded it.
        reference: JsonRef,
    },

    /// A `$ref` member holds text that is not a reference.
    #[error("invalid $ref '{raw}' at '{at}': {source}")]
    InvalidRef {
        /// The raw `$ref` value.
        raw: String,
        /// Pointer to the node holding it.
        at: JsonPointer,
        /// Parse failure.
        #[source]
        source: RefError,
    },

    /// The document holding a target could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

impl ResolveError {
    /// Returns true for errors that retrying cannot fix.
    ///
    /// Loops, depth overruns and malformed references are properties of the
    /// documents. Load failures may be transient.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Load(LoadError::Download { .. }))
    }
}

/// A settings file could not be read or applied.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The file could not be read.
    #[error("cannot read settings file '{}': {source}", .path.display())]
    Io {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML text is malformed or has the wrong shape.
    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON text is malformed or has the wrong shape.
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting was rejected by the configuration builder.
    #[error("invalid setting: {0}")]
    Config(#[from] ConfigError),
}

fn display_chain(chain: &[JsonRef]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
