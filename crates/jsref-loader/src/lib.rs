//! # jsref-loader — Schema Loader and Registry
//!
//! Maps absolute URIs to schema trees and follows `$ref` chains across
//! documents.
//!
//! ## Components
//!
//! - [`LoadingConfiguration`] / [`LoadingConfigurationBuilder`]: frozen
//!   settings and their mutable builder (downloaders, namespace, redirects,
//!   strategy, cache size, preloads).
//! - [`UriDownloader`]: per-scheme fetch plugins. `file`, `http`, `https`
//!   and `resource` ship by default.
//! - [`DocumentCache`]: bounded LRU with per-URI single-flight fills.
//! - [`SchemaLoader`]: the registry tying the above together.
//! - [`RefResolver`]: follows `$ref` chains with loop and depth detection.
//! - [`LoaderSettings`]: YAML/JSON settings file.
//!
//! ## Concurrency
//!
//! `SchemaLoader` is `Send + Sync` and meant to be shared. Trees it returns
//! are independent values; fork them to branch a walk.
//!
//! ## Crate Policy
//!
//! - Synchronous. Downloaders block the calling thread.
//! - No `.unwrap()` outside tests.

pub mod bundled;
pub mod cache;
pub mod config;
pub mod downloader;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod settings;

pub use bundled::{BundledSchema, BUNDLED_SCHEMAS};
pub use cache::DocumentCache;
pub use config::{LoadingConfiguration, LoadingConfigurationBuilder, DEFAULT_CACHE_SIZE};
pub use downloader::{FileDownloader, HttpDownloader, ResourceDownloader, UriDownloader};
pub use error::{ConfigError, DownloadError, LoadError, ResolveError, SettingsError};
pub use registry::SchemaLoader;
pub use resolver::{RefCheck, RefResolver, ResolvedSchema, DEFAULT_MAX_DEPTH, REF_KEYWORD};
pub use settings::LoaderSettings;
