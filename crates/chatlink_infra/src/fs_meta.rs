use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use chatlink_services::FileInfoInfra;

/// Filesystem metadata lookups backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatlinkFileMeta;

impl ChatlinkFileMeta {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl FileInfoInfra for ChatlinkFileMeta {
    async fn is_file(&self, path: &Path) -> anyhow::Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
            Err(error) if error.kind() == ErrorKind::NotADirectory => Ok(false),
            Err(error) => Err(error)
                .with_context(|| format!("Failed to read metadata of '{}'", path.display())),
        }
    }
}
