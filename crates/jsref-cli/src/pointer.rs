//! # `jsref pointer` — Address a Document with a JSON Pointer
//!
//! Prints the addressed value as pretty JSON. A pointer that does not
//! reach a value exits with [`EXIT_FAILED`](crate::EXIT_FAILED).

use anyhow::{Context, Result};
use clap::Args;
use jsref_core::JsonPointer;
use jsref_loader::SchemaLoader;
use serde_json::Value;

use crate::{load_target, EXIT_FAILED};

/// Arguments for `jsref pointer`.
#[derive(Args, Debug)]
pub struct PointerArgs {
    /// File path or URI of the document.
    pub target: String,

    /// JSON Pointer to look up (for example `/definitions/a~1b`).
    pub pointer: String,
}

/// Execute the pointer subcommand.
pub fn run_pointer(args: &PointerArgs, loader: &SchemaLoader) -> Result<u8> {
    let pointer = JsonPointer::parse(&args.pointer)
        .with_context(|| format!("invalid JSON Pointer '{}'", args.pointer))?;
    let tree = load_target(loader, &args.target)?;

    match lookup(tree.base(), &pointer) {
        Some(text) => {
            println!("{text}");
            Ok(0)
        }
        None => {
            eprintln!("no value at '{pointer}' in {}", tree.loading_ref());
            Ok(EXIT_FAILED)
        }
    }
}

fn lookup(document: &Value, pointer: &JsonPointer) -> Option<String> {
    pointer
        .get(document)
        .and_then(|value| serde_json::to_string_pretty(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_finds_escaped_members() {
        let doc = json!({"definitions": {"a/b": {"type": "null"}}});
        let pointer = JsonPointer::parse("/definitions/a~1b").unwrap();
        let text = lookup(&doc, &pointer).unwrap();
        assert!(text.contains("\"null\""));
    }

    #[test]
    fn lookup_misses_leading_zero_index() {
        let doc = json!({"items": [1, 2]});
        assert!(lookup(&doc, &JsonPointer::parse("/items/0").unwrap()).is_some());
        assert!(lookup(&doc, &JsonPointer::parse("/items/00").unwrap()).is_none());
    }

    #[test]
    fn run_reports_missing_with_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, r#"{"a": 1}"#).unwrap();
        let loader = SchemaLoader::with_defaults();

        let found = PointerArgs {
            target: path.display().to_string(),
            pointer: "/a".into(),
        };
        assert_eq!(run_pointer(&found, &loader).unwrap(), 0);

        let missing = PointerArgs {
            target: path.display().to_string(),
            pointer: "/b".into(),
        };
        assert_eq!(run_pointer(&missing, &loader).unwrap(), EXIT_FAILED);

        let malformed = PointerArgs {
            target: path.display().to_string(),
            pointer: "a".into(),
        };
        assert!(run_pointer(&malformed, &loader).is_err());
    }
}
