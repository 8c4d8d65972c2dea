// src/services/media_store.rs
// DOCUMENTATION: Stored-media lifecycle
// PURPOSE: Best-effort release of uploaded image files after place deletion

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Releases stored media references. Deletion of a place is already
/// acknowledged by the time this runs: failures are logged per item and
/// never surface to the caller.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn release(&self, paths: &[String]);
}

/// Local-filesystem media store. Uploads are written under one root
/// directory by the upstream file-upload middleware; stored references are
/// paths relative to that root.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a stored reference under the root. References that are
    /// absolute or climb out of the root are refused.
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let path = Path::new(reference);
        if path.is_absolute() {
            return None;
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return None;
        }
        Some(self.root.join(path))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn release(&self, paths: &[String]) {
        for reference in paths {
            let Some(full_path) = self.resolve(reference) else {
                log::warn!("Refusing to release media reference '{}'", reference);
                continue;
            };

            match tokio::fs::remove_file(&full_path).await {
                Ok(()) => log::info!("Released media file {}", full_path.display()),
                // Continue-on-error over the whole list; each failure is
                // independently reported
                Err(e) => log::warn!(
                    "Failed to release media file {}: {}",
                    full_path.display(),
                    e
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("media-store-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        root
    }

    #[tokio::test]
    async fn release_removes_stored_files() {
        let root = temp_root().await;
        let file = root.join("photo.jpg");
        tokio::fs::write(&file, b"jpeg").await.unwrap();

        let store = LocalMediaStore::new(&root);
        store.release(&["photo.jpg".to_string()]).await;

        assert!(!file.exists());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn missing_files_do_not_abort_the_batch() {
        let root = temp_root().await;
        let kept = root.join("kept.jpg");
        tokio::fs::write(&kept, b"jpeg").await.unwrap();

        let store = LocalMediaStore::new(&root);
        // First reference does not exist; second must still be released
        store
            .release(&["gone.jpg".to_string(), "kept.jpg".to_string()])
            .await;

        assert!(!kept.exists());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_references_are_refused() {
        let root = temp_root().await;
        let outside = std::env::temp_dir().join(format!("outside-{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&outside, b"jpeg").await.unwrap();

        let store = LocalMediaStore::new(&root);
        store
            .release(&[format!("../{}", outside.file_name().unwrap().to_string_lossy())])
            .await;

        assert!(outside.exists());
        tokio::fs::remove_file(&outside).await.unwrap();
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
