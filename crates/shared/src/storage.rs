//! 文件存储模块
//!
//! 提供"公开磁盘"语义的本地文件存储：上传文件按子目录落盘，
//! 文件名由服务端生成（UUID），数据库只记录相对路径，
//! 对外通过 `public_base_url` 前缀映射成可访问的 URL。

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{CoreError, Result};

/// 本地磁盘文件存储
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl DiskStorage {
    /// 创建存储实例
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 保存文件内容到指定子目录，返回数据库中记录的相对路径
    ///
    /// 文件名由 UUID 生成，扩展名取自原始文件名（小写）。
    pub async fn put(&self, dir: &str, original_name: &str, bytes: &[u8]) -> Result<String> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let file_name = match ext {
            Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
            _ => Uuid::new_v4().to_string(),
        };

        let relative = format!("{}/{}", dir.trim_matches('/'), file_name);
        let absolute = self.resolve(&relative)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&absolute, bytes).await?;

        Ok(relative)
    }

    /// 删除相对路径对应的文件
    ///
    /// 文件不存在视为成功（幂等删除）。
    pub async fn delete(&self, relative_path: &str) -> Result<()> {
        let absolute = self.resolve(relative_path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 检查相对路径对应的文件是否存在
    pub async fn exists(&self, relative_path: &str) -> bool {
        match self.resolve(relative_path) {
            Ok(absolute) => fs::try_exists(&absolute).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// 相对路径映射为对外访问 URL
    pub fn url(&self, relative_path: &str) -> String {
        format!("{}/{}", self.public_base_url, relative_path.trim_start_matches('/'))
    }

    /// 存储根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 相对路径转绝对路径，拒绝越出根目录的路径
    fn resolve(&self, relative_path: &str) -> Result<PathBuf> {
        let relative = Path::new(relative_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || relative.as_os_str().is_empty() {
            return Err(CoreError::Storage(format!(
                "非法的存储路径: {}",
                relative_path
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> (DiskStorage, PathBuf) {
        let root = std::env::temp_dir().join(format!("catalog-storage-test-{}", Uuid::new_v4()));
        let storage = DiskStorage::new(&StorageConfig {
            root: root.to_string_lossy().into_owned(),
            public_base_url: "/storage".to_string(),
        });
        (storage, root)
    }

    #[tokio::test]
    async fn test_put_exists_delete_roundtrip() {
        let (storage, root) = test_storage();

        let path = storage.put("banners", "hero.PNG", b"fake image").await.unwrap();
        assert!(path.starts_with("banners/"));
        assert!(path.ends_with(".png"), "扩展名应转为小写: {}", path);
        assert!(storage.exists(&path).await);

        storage.delete(&path).await.unwrap();
        assert!(!storage.exists(&path).await);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let (storage, root) = test_storage();
        storage.delete("banners/no-such-file.png").await.unwrap();
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn test_put_without_extension() {
        let (storage, root) = test_storage();
        let path = storage.put("galleries", "blob", b"data").await.unwrap();
        assert!(!path.contains('.'), "无扩展名时不应出现点号: {}", path);
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_url_mapping() {
        let storage = DiskStorage::new(&StorageConfig {
            root: "storage/public".to_string(),
            public_base_url: "/storage/".to_string(),
        });
        assert_eq!(storage.url("banners/a.png"), "/storage/banners/a.png");
        assert_eq!(storage.url("/banners/a.png"), "/storage/banners/a.png");
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (storage, _root) = test_storage();
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("banners/../../x").is_err());
        assert!(storage.resolve("/absolute").is_ok(), "前导斜杠会被剥掉");
        assert!(storage.resolve("").is_err());
    }
}
