//! Version and build information for goview

/// Full version string including build metadata
///
/// Format: "goview {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    format!(
        "goview {} ({} {}) rustc {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version()
    )
}

pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Commit SHA, or "unknown" outside a git checkout
pub fn build_commit() -> &'static str {
    option_env!("GOVIEW_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("GOVIEW_BUILD_DATE").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("GOVIEW_RUSTC_VERSION").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_shape() {
        let v = version();
        assert!(v.starts_with(&format!("goview {} (", package_version())));
        assert!(v.contains(") rustc "));
    }
}
