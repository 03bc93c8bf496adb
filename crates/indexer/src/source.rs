use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;


/// Name of the marker file telling the refiner the lowest height still needed.
pub const RETENTION_MARKER: &str = ".REFINER_LAST_BLOCK";


/// File layout of the refiner output: one `<height>.json` per block,
/// grouped into subfolders of `shard_width` consecutive heights.
#[derive(Debug, Clone)]
pub struct BlockSource {
    root: PathBuf,
    shard_width: u64,
}


impl BlockSource {
    pub fn new(root: impl Into<PathBuf>, shard_width: u64) -> Self {
        Self {
            root: root.into(),
            shard_width,
        }
    }

    pub fn shard_dir(&self, height: u64) -> PathBuf {
        self.root
            .join((height / self.shard_width * self.shard_width).to_string())
    }

    pub fn block_file(&self, height: u64) -> PathBuf {
        self.shard_dir(height).join(format!("{height}.json"))
    }

    pub async fn read_block(&self, height: u64) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.block_file(height)).await
    }

    /// Removes the consumed file and, when `height` opens a new shard,
    /// the now fully drained previous shard folder. Failures are logged
    /// and the cursor still advances.
    pub async fn cleanup(&self, height: u64) {
        let file = self.block_file(height);
        if let Err(err) = tokio::fs::remove_file(&file).await {
            warn!(file = %file.display(), error = ?err, "unable to remove block file");
        }

        if height > 0 && height % self.shard_width == 0 {
            let dir = self.shard_dir(height - 1);
            if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = ?err, "unable to remove drained shard folder");
            }
        }
    }

    /// Publishes `height` as the lowest block this consumer still needs,
    /// so the refiner may discard older shards. Only moves forward: an
    /// existing marker at or above `height` is left untouched.
    pub fn update_retention_marker(&self, height: u64) -> anyhow::Result<()> {
        let file = self.root.join(RETENTION_MARKER);

        if let Ok(data) = std::fs::read_to_string(&file) {
            if data.trim().parse::<u64>().is_ok_and(|last| last >= height) {
                return Ok(());
            }
        }

        std::fs::write(&file, height.to_string())
            .with_context(|| format!("{} can not be updated", file.display()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn source(dir: &tempfile::TempDir) -> BlockSource {
        BlockSource::new(dir.path(), 10_000)
    }

    #[test]
    fn heights_group_into_shard_folders() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);

        assert_eq!(source.shard_dir(0), dir.path().join("0"));
        assert_eq!(source.shard_dir(9_999), dir.path().join("0"));
        assert_eq!(source.shard_dir(10_000), dir.path().join("10000"));
        assert_eq!(
            source.block_file(60_034_225),
            dir.path().join("60030000").join("60034225.json")
        );
    }

    #[tokio::test]
    async fn cleanup_removes_file_and_prior_shard_at_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);

        let prior_shard = dir.path().join("0");
        std::fs::create_dir_all(&prior_shard).unwrap();
        std::fs::write(prior_shard.join("9999.json"), b"{}").unwrap();

        let shard = dir.path().join("10000");
        std::fs::create_dir_all(&shard).unwrap();
        let file = shard.join("10000.json");
        std::fs::write(&file, b"{}").unwrap();

        source.cleanup(10_000).await;

        assert!(!file.exists());
        assert!(!prior_shard.exists());
        assert!(shard.exists());
    }

    #[tokio::test]
    async fn cleanup_inside_shard_keeps_folders() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);

        let shard = dir.path().join("10000");
        std::fs::create_dir_all(&shard).unwrap();
        let file = shard.join("10001.json");
        std::fs::write(&file, b"{}").unwrap();

        source.cleanup(10_001).await;

        assert!(!file.exists());
        assert!(shard.exists());
    }

    #[tokio::test]
    async fn cleanup_of_missing_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        source(&dir).cleanup(42).await;
    }

    #[test]
    fn retention_marker_only_moves_forward() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let marker = dir.path().join(RETENTION_MARKER);

        source.update_retention_marker(100).unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "100");

        source.update_retention_marker(50).unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "100");

        source.update_retention_marker(200).unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "200");
    }

    #[test]
    fn garbage_retention_marker_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let marker = dir.path().join(RETENTION_MARKER);

        std::fs::write(&marker, "not a number").unwrap();
        source.update_retention_marker(7).unwrap();
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "7");
    }
}
