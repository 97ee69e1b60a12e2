//! Line-oriented `go.mod` parser.
//!
//! Scanning is best-effort: unrecognized or truncated lines are skipped and
//! the only failure is an error from the underlying reader.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Parsed module manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub module_name: String,
    pub go_version: String,
    pub dependencies: Vec<Dependency>,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    /// Marked `// indirect`
    pub indirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub version: String,
}

/// Parse a manifest from a reader.
///
/// Recognized lines, in any order:
/// - `module <name>` (the last one wins)
/// - `go <version>`
/// - `require <name> <version> [// indirect]`
/// - `require (` ... `)` blocks of `<name> <version> [// indirect]` lines
/// - `tool <name> <version>`
pub fn parse_manifest(reader: impl BufRead) -> Result<Manifest> {
    let mut manifest = Manifest::default();
    let mut in_require_block = false;

    for line in reader.lines() {
        let line = line.map_err(|e| ModelError::from_io("", e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if let Some(name) = line.strip_prefix("module ") {
            manifest.module_name = name.trim().to_string();
            continue;
        }
        if let Some(version) = line.strip_prefix("go ") {
            manifest.go_version = version.trim().to_string();
            continue;
        }
        if line.starts_with("require (") {
            in_require_block = true;
            continue;
        }
        if in_require_block && line.starts_with(')') {
            in_require_block = false;
            continue;
        }
        if in_require_block || line.starts_with("require ") {
            let dep_line = line.strip_prefix("require").unwrap_or(line).trim();
            if let Some((name, version)) = name_and_version(dep_line) {
                manifest.dependencies.push(Dependency {
                    name,
                    version,
                    indirect: dep_line.ends_with("// indirect"),
                });
            }
            continue;
        }
        if let Some(tool_line) = line.strip_prefix("tool ") {
            if let Some((name, version)) = name_and_version(tool_line.trim()) {
                manifest.tools.push(Tool { name, version });
            }
        }
    }

    Ok(manifest)
}

/// Parse a manifest held in memory.
pub fn parse_manifest_str(text: &str) -> Result<Manifest> {
    parse_manifest(text.as_bytes())
}

fn name_and_version(line: &str) -> Option<(String, String)> {
    let mut fields = line.split_whitespace();
    let name = fields.next()?;
    let version = fields.next()?;
    Some((name.to_string(), version.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_MOD: &str = r#"module github.com/example/project

go 1.24.0

require (
	github.com/a-h/templ v0.3.898
	github.com/fsnotify/fsnotify v1.9.0
	github.com/stretchr/testify v1.10.0
	golang.org/x/sys v0.33.0 // indirect
)

require github.com/go-git/go-git/v6 v6.0.0-20250611

tool github.com/a-h/templ/cmd/templ v0.3.898
tool golang.org/x/tools/cmd/stringer v0.34.0
"#;

    fn dep(name: &str, version: &str, indirect: bool) -> Dependency {
        Dependency {
            name: name.to_string(),
            version: version.to_string(),
            indirect,
        }
    }

    #[test]
    fn test_parses_full_manifest() {
        let manifest = parse_manifest_str(GO_MOD).unwrap();

        assert_eq!(manifest.module_name, "github.com/example/project");
        assert_eq!(manifest.go_version, "1.24.0");
        assert_eq!(
            manifest.dependencies,
            vec![
                dep("github.com/a-h/templ", "v0.3.898", false),
                dep("github.com/fsnotify/fsnotify", "v1.9.0", false),
                dep("github.com/stretchr/testify", "v1.10.0", false),
                dep("golang.org/x/sys", "v0.33.0", true),
                dep("github.com/go-git/go-git/v6", "v6.0.0-20250611", false),
            ]
        );
        assert_eq!(
            manifest.tools,
            vec![
                Tool {
                    name: "github.com/a-h/templ/cmd/templ".to_string(),
                    version: "v0.3.898".to_string()
                },
                Tool {
                    name: "golang.org/x/tools/cmd/stringer".to_string(),
                    version: "v0.34.0".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_last_module_line_wins() {
        let manifest = parse_manifest_str("module first\nmodule second\n").unwrap();
        assert_eq!(manifest.module_name, "second");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = "module m\nrequire (\n\tonly-a-name\n\tgood v1.0.0\n)\ntool lonely\nwhatever else\n";
        let manifest = parse_manifest_str(text).unwrap();
        assert_eq!(manifest.dependencies, vec![dep("good", "v1.0.0", false)]);
        assert!(manifest.tools.is_empty());
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(parse_manifest_str("").unwrap(), Manifest::default());
    }
}
