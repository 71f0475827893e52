//! # `jsref resolve` — Follow a `$ref` Chain
//!
//! Starting at `--at` (the document root by default), follows `$ref`
//! members until a node that is not a reference, then prints every hop on
//! stderr and the final node as pretty JSON on stdout.

use anyhow::{Context, Result};
use clap::Args;
use jsref_core::JsonPointer;
use jsref_loader::{RefResolver, ResolveError, SchemaLoader, DEFAULT_MAX_DEPTH};

use crate::{load_target, EXIT_FAILED};

/// Arguments for `jsref resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// File path or URI of the document.
    pub target: String,

    /// JSON Pointer to start from.
    #[arg(long, default_value = "")]
    pub at: String,

    /// Maximum number of `$ref` hops before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs, loader: &SchemaLoader) -> Result<u8> {
    let start = JsonPointer::parse(&args.at)
        .with_context(|| format!("invalid JSON Pointer '{}'", args.at))?;
    let mut tree = load_target(loader, &args.target)?;
    if tree.node_at(&start).is_none() {
        eprintln!("no value at '{start}' in {}", tree.loading_ref());
        return Ok(EXIT_FAILED);
    }
    tree.jump_to(&start);

    let resolver = RefResolver::new(loader).with_max_depth(args.max_depth);
    match resolver.resolve(tree) {
        Ok(resolved) => {
            for hop in &resolved.chain {
                eprintln!("-> {hop}");
            }
            let node = resolved.node().context("resolved node vanished")?;
            println!("{}", serde_json::to_string_pretty(node)?);
            Ok(0)
        }
        Err(e @ (ResolveError::Unresolvable { .. } | ResolveError::RefLoop { .. })) => {
            eprintln!("{e}");
            Ok(EXIT_FAILED)
        }
        Err(e) => Err(e).context("cannot resolve $ref chain"),
    }
}
