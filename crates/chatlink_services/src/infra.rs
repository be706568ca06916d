use std::path::Path;

/// Read-only view of the filesystem used to confirm that a mentioned path is
/// a real file before it is turned into an anchor.
#[async_trait::async_trait]
pub trait FileInfoInfra: Send + Sync {
    async fn is_file(&self, path: &Path) -> anyhow::Result<bool>;
}
