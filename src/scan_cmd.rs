//! Scan command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use goview::output::{generate_execution_id, output_json, render_human, JsonResponse, ScanResponse};
use goview::{build_module, DirFs, IgnoreMatcher, OutputFormat};

pub fn run_scan(
    root: PathBuf,
    ignore_patterns: Vec<String>,
    gitignore_aware: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("cannot resolve root {}", root.display()))?;
    let ignores = IgnoreMatcher::for_root(&root, gitignore_aware, &ignore_patterns)
        .context("invalid ignore pattern")?;

    let fs = DirFs::new(&root);
    let module = build_module(&fs, ".", ignores)
        .with_context(|| format!("scan of {} failed", root.display()))?;
    tracing::info!(root = %root.display(), packages = module.packages.len(), "scanned");

    if output_format.is_json() {
        let response = ScanResponse {
            root: root.display().to_string(),
            summary: module.summary(),
            module: &module,
        };
        let execution_id = generate_execution_id();
        output_json(&JsonResponse::new(response, &execution_id), output_format)
    } else {
        print!("{}", render_human(&module));
        Ok(())
    }
}
