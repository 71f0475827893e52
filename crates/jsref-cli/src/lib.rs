//! # jsref-cli — Command-Line Front End
//!
//! Provides the `jsref` binary.
//!
//! ## Subcommands
//!
//! - `jsref pointer` — Print the value a JSON Pointer addresses.
//! - `jsref resolve` — Follow a `$ref` chain to the node it ends on.
//! - `jsref check` — Resolve every `$ref` in a schema.
//!
//! ```bash
//! jsref pointer schema.json /definitions/address
//! jsref resolve schema.json --at /properties/billing
//! jsref --inline check https://example.com/schemas/order.json
//! ```
//!
//! ## Exit Codes
//!
//! `0` success, `1` error (unreadable input, bad arguments), `2` the
//! requested node is missing or at least one reference failed.

pub mod check;
pub mod pointer;
pub mod resolve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jsref_core::JsonRef;
use jsref_loader::{LoaderSettings, LoadingConfigurationBuilder, SchemaLoader};
use jsref_tree::Dereferencing;

/// Exit code for a missing node or a failed reference.
pub const EXIT_FAILED: u8 = 2;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Settings file to apply on top of the defaults.
    pub config: Option<PathBuf>,
    /// Use inline dereferencing regardless of settings.
    pub inline: bool,
}

/// Build a loader from the defaults, an optional settings file and flags.
///
/// The namespace defaults to the current directory, so relative paths and
/// relative URIs name files under it.
pub fn build_loader(options: &LoaderOptions) -> Result<SchemaLoader> {
    let mut builder = LoadingConfigurationBuilder::new();

    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let namespace = url::Url::from_directory_path(&cwd)
        .map_err(|()| anyhow::anyhow!("cannot express '{}' as a URL", cwd.display()))?;
    builder
        .set_namespace(namespace.as_str())
        .context("invalid default namespace")?;

    if let Some(path) = &options.config {
        let settings = LoaderSettings::from_path(path)?;
        settings
            .apply(&mut builder)
            .with_context(|| format!("applying settings from '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "applied settings file");
    }
    if options.inline {
        builder.set_dereferencing(Dereferencing::Inline);
    }

    Ok(SchemaLoader::new(builder.freeze()))
}

/// Turn a command-line target into a reference.
///
/// Anything with a URI scheme of two or more characters is taken as a URI.
/// Everything else is a filesystem path, made absolute against the current
/// directory.
pub fn target_reference(target: &str) -> Result<JsonRef> {
    if let Ok(reference) = JsonRef::parse(target) {
        let has_scheme = reference.uri().scheme().is_some_and(|s| s.len() > 1);
        if has_scheme {
            return Ok(reference);
        }
    }

    let path = Path::new(target);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot determine current directory")?
            .join(path)
    };
    let url = url::Url::from_file_path(&absolute)
        .map_err(|()| anyhow::anyhow!("cannot express '{}' as a URL", absolute.display()))?;
    JsonRef::parse(url.as_str()).with_context(|| format!("invalid file URL '{url}'"))
}

/// Load the document a target names.
pub fn load_target(loader: &SchemaLoader, target: &str) -> Result<jsref_tree::SchemaTree> {
    let reference = target_reference(target)?;
    loader
        .get_ref(&reference.to_locator())
        .with_context(|| format!("cannot load '{target}'"))
}
