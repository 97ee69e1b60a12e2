//! Recursive tree scan producing the flat, pre-ordered package list.

use crate::error::Result;
use crate::fs::SourceFs;
use crate::ingest::{parse_source_unit, SourceUnit};
use crate::model::filter::IgnoreMatcher;
use crate::model::package::{scan_package, PackageAndUnits};
use crate::validation::{clean_path, join_path};

/// Scan `dir` and every non-ignored directory below it.
///
/// Nodes come out depth-first and pre-order: a directory always precedes its
/// children, and siblings follow listing order. Ignored subtrees are never
/// opened, so errors inside them cannot surface.
///
/// # Errors
/// The first listing, open or parse failure encountered.
pub fn build_tree(
    fs: &dyn SourceFs,
    dir: &str,
    ignores: &IgnoreMatcher,
) -> Result<Vec<PackageAndUnits>> {
    let mut packages = Vec::new();
    collect(fs, &clean_path(dir), ignores, &mut packages)?;
    Ok(packages)
}

fn collect(
    fs: &dyn SourceFs,
    dir: &str,
    ignores: &IgnoreMatcher,
    out: &mut Vec<PackageAndUnits>,
) -> Result<()> {
    let package = scan_package(fs, dir)?;

    let units = package
        .test_files
        .iter()
        .map(|file| load_unit(fs, &package.directory, file))
        .collect::<Result<Vec<_>>>()?;

    let subdirectories = package.subdirectories.clone();
    out.push(PackageAndUnits { package, units });

    for subdir in subdirectories {
        let path = join_path(dir, &subdir);
        if ignores.is_ignored(&path, true) {
            tracing::debug!(path = %path, "skipping ignored directory");
            continue;
        }
        collect(fs, &path, ignores, out)?;
    }

    Ok(())
}

/// Read and parse one test file into a named unit.
pub fn load_unit(fs: &dyn SourceFs, dir: &str, file_name: &str) -> Result<SourceUnit> {
    let path = join_path(dir, file_name);
    let source = fs.read(&path)?;
    let mut unit = parse_source_unit(&source).map_err(|e| e.with_path(&path))?;
    unit.name = file_name.to_string();
    unit.path = path;
    Ok(unit)
}
