//! gorace IR: intermediate representation of the analyzed Go program.
//!
//! The IR is built by the Go bridge (go/ssa) and handed over as JSON. This
//! crate provides:
//! - Owned IR types matching the bridge output
//! - Call graph representation

pub mod call_graph; // Call graph queries
pub mod ir; // High-level IR wrappers

use std::path::{Path, PathBuf};

/// Errors raised while loading bridge output.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid IR JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a bridge JSON document.
pub fn load_program_str(json: &str) -> Result<ir::Program, LoadError> {
    Ok(serde_json::from_str(json)?)
}

/// Load a bridge JSON file and convert it to the owned IR.
pub fn load_program_file(path: &Path) -> Result<ir::Program, LoadError> {
    let data = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_program_str(&data)
}

/// Path of a fixture under `tests/fixtures/` at the workspace root.
#[cfg(any(test, feature = "test-fixtures"))]
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/fixtures")
        .join(format!("{name}.json"))
}

/// Load a fixture file from `tests/fixtures/` by name (without `.json`).
///
/// This is available in test builds and when the `test-fixtures` feature is enabled.
#[cfg(any(test, feature = "test-fixtures"))]
pub fn load_fixture(name: &str) -> ir::Program {
    load_program_file(&fixture_path(name))
        .unwrap_or_else(|e| panic!("failed to load fixture {name}: {e}"))
}
