//! Test utilities shared by the chatlink crates.
//!
//! Provides fixture loading relative to the calling crate and linkifier test
//! doubles with predictable behaviour.

mod linkifiers;

pub use linkifiers::*;

/// Loads a fixture file.
///
/// # Arguments
/// * `path` - Absolute path, usually built by the [`fixture!`] macro
///
/// # Example
/// ```ignore
/// let content = fixture("src/fixtures/response.md").await;
/// ```
pub async fn fixture(path: &str) -> String {
    tokio::fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("Failed to load fixture at {path}: {e}"))
}

/// Loads a fixture file relative to the calling crate's manifest directory.
///
/// # Example
/// ```ignore
/// let content = fixture!("/src/fixtures/response.md").await;
/// ```
#[macro_export]
macro_rules! fixture {
    ($path:expr) => {
        $crate::fixture(&format!("{}{}", env!("CARGO_MANIFEST_DIR"), $path))
    };
}
