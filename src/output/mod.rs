//! Output formatting for CLI commands
//!
//! JSON responses are wrapped in a schema-versioned envelope so consumers can
//! detect format changes.

use std::fmt::Write as _;

use serde::Serialize;

use crate::model::{Module, ModuleSummary, ReconcileOutcome};

/// Version of the JSON envelope and payload layout
pub const GOVIEW_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Output format for CLI responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Human,
    /// Single-line JSON
    Json,
    /// Indented JSON
    Pretty,
}

impl OutputFormat {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Some(OutputFormat::Human),
            "json" => Some(OutputFormat::Json),
            "pretty" => Some(OutputFormat::Pretty),
            _ => None,
        }
    }

    pub fn is_json(self) -> bool {
        !matches!(self, OutputFormat::Human)
    }
}

/// Envelope for every JSON response
#[derive(Debug, Clone, Serialize)]
pub struct JsonResponse<T> {
    pub schema_version: String,
    /// Identifies the process run that produced the response
    pub execution_id: String,
    pub data: T,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        Self {
            schema_version: GOVIEW_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            data,
        }
    }
}

/// Payload of `goview scan`
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse<'a> {
    pub root: String,
    pub summary: ModuleSummary,
    pub module: &'a Module,
}

/// Payload emitted by `goview watch` after each applied change
#[derive(Debug, Clone, Serialize)]
pub struct ChangeResponse {
    pub outcome: String,
    pub summary: ModuleSummary,
}

impl ChangeResponse {
    pub fn new(module: &Module, outcome: &ReconcileOutcome) -> Self {
        Self {
            outcome: outcome.to_string(),
            summary: module.summary(),
        }
    }
}

/// Generate an execution id from the current time and process id
///
/// Format: `{timestamp_hex}-{pid_hex}`
pub fn generate_execution_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    // A clock before the epoch only affects the id, never the output
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{:x}-{:x}", timestamp, std::process::id())
}

/// Serialize `data` to stdout as JSON
pub fn output_json<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
        _ => serde_json::to_string(data)?,
    };
    println!("{}", json);
    Ok(())
}

/// Render the module as an indented package listing.
pub fn render_human(module: &Module) -> String {
    let mut out = String::new();
    match &module.manifest {
        Some(manifest) => {
            let _ = writeln!(out, "module {}", manifest.module_name);
            if !manifest.go_version.is_empty() {
                let _ = writeln!(out, "go {}", manifest.go_version);
            }
            for dep in &manifest.dependencies {
                let marker = if dep.indirect { " // indirect" } else { "" };
                let _ = writeln!(out, "  require {} {}{}", dep.name, dep.version, marker);
            }
        }
        None => {
            let _ = writeln!(out, "(no go.mod)");
        }
    }

    for entry in &module.packages {
        let pkg = &entry.package;
        let name = if pkg.name.is_empty() { "-" } else { pkg.name.as_str() };
        let _ = writeln!(
            out,
            "{} [{}] {} go, {} test",
            pkg.directory,
            name,
            pkg.go_files.len(),
            pkg.test_files.len()
        );
        for unit in &entry.units {
            let _ = writeln!(
                out,
                "  {}: {} tests, {} examples, {} benchmarks",
                unit.name,
                unit.tests.len(),
                unit.examples.len(),
                unit.benchmarks.len()
            );
        }
    }

    let s = module.summary();
    let _ = writeln!(
        out,
        "{} packages, {} tests, {} examples, {} benchmarks",
        s.packages, s.tests, s.examples, s.benchmarks
    );
    out
}
