//! Shared test tooling: fixture discovery under `test_data/`, fixture
//! front matter, test logging and a reference interpreter.

pub mod fixture;
pub mod interp;

pub use fixture::{ExpectedStatus, Fixture, FixtureConfig, FixtureError};
pub use interp::{InterpError, Interpreter, Pointer, Value};

use once_cell::sync::Lazy;
use std::path::PathBuf;
use walkdir::WalkDir;

pub(crate) static WORKSPACE_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let mut current = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    loop {
        if current.join("Cargo.toml").exists() {
            let cargo_toml = std::fs::read_to_string(current.join("Cargo.toml"))
                .expect("Failed to read Cargo.toml");
            if cargo_toml.contains("[workspace]") {
                return current;
            }
        }

        current = current
            .parent()
            .expect("Could not find workspace root")
            .to_path_buf();
    }
});

pub fn test_data_path() -> PathBuf {
    WORKSPACE_ROOT.join("test_data")
}

/// Absolute path of a fixture given relative to `test_data/`
/// (e.g. `"scalar_replacement/struct_load_store.spvasm"`)
pub fn fixture_path(name: &str) -> PathBuf {
    test_data_path().join(name)
}

/// Every `.spvasm` file under `test_data/<subdir>`, as paths relative to
/// `test_data/`, sorted
pub fn discover_fixtures(subdir: &str) -> Vec<String> {
    let base = test_data_path();
    let mut fixtures: Vec<String> = WalkDir::new(base.join(subdir))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("spvasm"))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(&base)
                .ok()
                .map(|relative| relative.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    fixtures.sort();
    fixtures
}

/// Routes `log` records of the code under test to the test output.
/// Filtered by `RUST_LOG`; safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
