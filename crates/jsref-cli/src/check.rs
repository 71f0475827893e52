//! # `jsref check` — Resolve Every `$ref` in a Schema
//!
//! Prints one line per `$ref` site and a summary. Exits with
//! [`EXIT_FAILED`](crate::EXIT_FAILED) if any reference fails.

use anyhow::Result;
use clap::Args;
use jsref_loader::{RefCheck, RefResolver, SchemaLoader, DEFAULT_MAX_DEPTH};

use crate::{load_target, EXIT_FAILED};

/// Arguments for `jsref check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// File path or URI of the schema.
    pub target: String,

    /// Maximum number of `$ref` hops per site.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Only print failures and the summary.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs, loader: &SchemaLoader) -> Result<u8> {
    let tree = load_target(loader, &args.target)?;
    let checks = RefResolver::new(loader)
        .with_max_depth(args.max_depth)
        .check_refs(&tree);

    for check in &checks {
        if let Some(line) = report_line(check, args.quiet) {
            println!("{line}");
        }
    }

    let failed = checks.iter().filter(|c| !c.is_ok()).count();
    println!(
        "{} reference(s) checked in {}: {} ok, {} failed",
        checks.len(),
        tree.loading_ref(),
        checks.len() - failed,
        failed
    );
    Ok(if failed == 0 { 0 } else { EXIT_FAILED })
}

fn report_line(check: &RefCheck, quiet: bool) -> Option<String> {
    match &check.outcome {
        Ok(target) if !quiet => Some(format!("  OK    {} -> {target}", display_pointer(check))),
        Ok(_) => None,
        Err(e) => Some(format!(
            "  FAIL  {} ({}): {e}",
            display_pointer(check),
            check.raw
        )),
    }
}

fn display_pointer(check: &RefCheck) -> String {
    if check.pointer.is_root() {
        "(root)".to_string()
    } else {
        check.pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_site_sets_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(
            &path,
            r##"{"definitions": {"a": {}}, "properties": {"x": {"$ref": "#/definitions/a"}, "y": {"$ref": "#/definitions/b"}}}"##,
        )
        .unwrap();
        let loader = SchemaLoader::with_defaults();
        let args = CheckArgs {
            target: path.display().to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            quiet: false,
        };
        assert_eq!(run_check(&args, &loader).unwrap(), EXIT_FAILED);
    }

    #[test]
    fn clean_schema_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, r##"{"items": {"$ref": "#"}}"##).unwrap();
        let loader = SchemaLoader::with_defaults();
        let args = CheckArgs {
            target: path.display().to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            quiet: true,
        };
        assert_eq!(run_check(&args, &loader).unwrap(), 0);
    }

    #[test]
    fn quiet_hides_successes() {
        let check = RefCheck {
            pointer: jsref_core::JsonPointer::root(),
            raw: "#".into(),
            outcome: Ok(jsref_core::JsonRef::empty()),
        };
        assert!(report_line(&check, true).is_none());
        assert!(report_line(&check, false).unwrap().contains("(root)"));
    }
}
