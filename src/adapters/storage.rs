use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 以本機目錄為根的檔案儲存
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.base_path.join(path))
            .await
            .unwrap_or(false)
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(self.base_path.join(path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        tokio_test::block_on(async {
            storage
                .write_file("receipts/2025/abc.jpg", b"jpeg-bytes")
                .await
                .unwrap();
            assert!(storage.exists("receipts/2025/abc.jpg").await);
            assert_eq!(
                storage.read_file("receipts/2025/abc.jpg").await.unwrap(),
                b"jpeg-bytes"
            );
            assert!(!storage.exists("receipts/2025/missing.jpg").await);

            storage.delete_file("receipts/2025/abc.jpg").await.unwrap();
            assert!(!storage.exists("receipts/2025/abc.jpg").await);
        });
    }
}
