//! Disk-backed store for uploaded product images.
//!
//! Stored names are prefixed with a fresh UUID so concurrent uploads of
//! the same file name never collide, and the original name survives for
//! operators browsing the directory.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Saves, serves, and removes uploaded image files under one directory.
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the store, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Internal(format!("creating upload directory: {e}")))?;
        Ok(Self { dir })
    }

    /// Directory served statically under `/uploads`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an uploaded file. Returns the stored file name.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let stored = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        tokio::fs::write(self.dir.join(&stored), bytes)
            .await
            .map_err(|e| Error::Internal(format!("writing upload: {e}")))?;
        Ok(stored)
    }

    /// Remove a stored file. Best effort: a missing file is fine, anything
    /// else is logged and swallowed — the record it belonged to is already
    /// gone or repointed.
    pub async fn delete(&self, stored_name: &str) {
        // stored names never contain separators; refuse anything that does
        if stored_name.contains('/') || stored_name.contains('\\') || stored_name.contains("..") {
            warn!(file = %stored_name, "refusing to delete suspicious upload name");
            return;
        }
        match tokio::fs::remove_file(self.dir.join(stored_name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %stored_name, error = %e, "failed to delete upload"),
        }
    }
}

/// Keep alphanumerics, dots, dashes, and underscores; everything else
/// becomes an underscore.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("storefront-uploads-{}", Uuid::new_v4()));
        ImageStore::new(dir).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let store = store().await;
        let name = store.save("widget.png", b"fake image bytes").await.unwrap();
        assert!(name.ends_with("widget.png"));

        let on_disk = store.dir().join(&name);
        assert!(tokio::fs::try_exists(&on_disk).await.unwrap());

        store.delete(&name).await;
        assert!(!tokio::fs::try_exists(&on_disk).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_silent() {
        let store = store().await;
        store.delete("never-existed.png").await;
    }

    #[tokio::test]
    async fn test_traversal_names_are_refused() {
        let store = store().await;
        // must not panic or touch anything outside the directory
        store.delete("../../etc/passwd").await;
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a photo (1).png"), "a_photo__1_.png");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name("ok-name_2.jpg"), "ok-name_2.jpg");
    }
}
