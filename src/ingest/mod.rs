pub mod go;
pub mod gomod;
pub mod pool;

pub use go::{detect_package_name, parse_source_unit};
pub use gomod::{parse_manifest, parse_manifest_str, Dependency, Manifest, Tool};

use serde::{Deserialize, Serialize};

/// File name of the module manifest at the module root.
pub const MANIFEST_FILE: &str = "go.mod";

/// Suffix marking a test-bearing source file.
pub const TEST_SUFFIX: &str = "_test.go";

/// Extension of ordinary source files.
pub const SOURCE_EXT: &str = ".go";

/// Classification of a file name inside a package directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `*_test.go`
    Test,
    /// Any other `*.go`
    Source,
    /// Everything else
    Other,
}

impl FileKind {
    pub fn of(name: &str) -> Self {
        if name.ends_with(TEST_SUFFIX) {
            FileKind::Test
        } else if name.ends_with(SOURCE_EXT) {
            FileKind::Source
        } else {
            FileKind::Other
        }
    }

    /// Whether files of this kind carry a package clause.
    pub fn is_source(self) -> bool {
        matches!(self, FileKind::Test | FileKind::Source)
    }
}

/// A `func TestXxx(t *testing.T)` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Test {
    pub name: String,
}

/// A `func ExampleXxx()` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub name: String,
}

/// A `func BenchmarkXxx(b *testing.B)` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub name: String,
}

/// Declarations extracted from one test file.
///
/// `name` is the file name and `path` the module-relative path. Both are
/// empty when the unit comes straight out of the parser; the scanner and the
/// reconciler fill them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub name: String,
    pub path: String,
    pub tests: Vec<Test>,
    pub examples: Vec<Example>,
    pub benchmarks: Vec<Benchmark>,
}

impl SourceUnit {
    /// Total number of extracted declarations.
    pub fn declaration_count(&self) -> usize {
        self.tests.len() + self.examples.len() + self.benchmarks.len()
    }
}
