//! Flat directory of stored reference photos, addressed by file name.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageStoreError {
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Location of the photo a user record points at.
    ///
    /// Only the final component of the reference is kept, so records holding
    /// `uploads/alice.jpg` or `C:\uploads\alice.jpg` both resolve to
    /// `<root>/alice.jpg`. The result may not exist.
    pub fn stored_path(&self, photo: &str) -> PathBuf {
        let name = photo.rsplit(['/', '\\']).next().unwrap_or(photo);
        self.root.join(name)
    }

    /// Location of a file requested by name over HTTP.
    ///
    /// Names that could escape the directory are rejected.
    pub fn public_path(&self, filename: &str) -> Result<PathBuf, ImageStoreError> {
        if !is_plain_file_name(filename) {
            return Err(ImageStoreError::InvalidName(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }

    /// True when `path` names an existing regular file.
    pub async fn is_file(path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn read(path: &Path) -> Result<Vec<u8>, ImageStoreError> {
        tokio::fs::read(path).await.map_err(|source| ImageStoreError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A single path segment with no separators or parent references.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_path_keeps_basename() {
        let store = ImageStore::new("/srv/photos");
        assert_eq!(store.stored_path("alice.jpg"), PathBuf::from("/srv/photos/alice.jpg"));
        assert_eq!(
            store.stored_path("public/user_images/alice.jpg"),
            PathBuf::from("/srv/photos/alice.jpg")
        );
        assert_eq!(
            store.stored_path(r"C:\uploads\bob.png"),
            PathBuf::from("/srv/photos/bob.png")
        );
        assert_eq!(store.stored_path("../../etc/passwd"), PathBuf::from("/srv/photos/passwd"));
    }

    #[test]
    fn test_stored_path_trailing_separator_is_directory() {
        let store = ImageStore::new("/srv/photos");
        assert_eq!(store.stored_path("uploads/"), PathBuf::from("/srv/photos/"));
    }

    #[test]
    fn test_public_path_accepts_plain_names() {
        let store = ImageStore::new("/srv/photos");
        assert_eq!(
            store.public_path("alice.jpg").unwrap(),
            PathBuf::from("/srv/photos/alice.jpg")
        );
        assert!(store.public_path("alice smith (1).jpeg").is_ok());
        assert_eq!(
            store.public_path("john..jpg").unwrap(),
            PathBuf::from("/srv/photos/john..jpg")
        );
        assert!(store.public_path("a..b.png").is_ok());
        assert!(store.public_path("...").is_ok());
    }

    #[test]
    fn test_public_path_rejects_traversal() {
        let store = ImageStore::new("/srv/photos");
        for bad in ["", ".", "..", "../secret", "a/b.jpg", r"..\boot.ini", "x\0.jpg", "/etc/passwd"] {
            assert!(
                matches!(store.public_path(bad), Err(ImageStoreError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_is_file_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();

        assert!(ImageStore::is_file(&path).await);
        assert!(!ImageStore::is_file(dir.path()).await);
        assert!(!ImageStore::is_file(&dir.path().join("missing.jpg")).await);
        assert_eq!(ImageStore::read(&path).await.unwrap(), b"jpeg bytes");
        assert!(matches!(
            ImageStore::read(&dir.path().join("missing.jpg")).await,
            Err(ImageStoreError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("public/user_images"));
        store.ensure_dir().await.unwrap();
        assert!(store.root().is_dir());
        // Idempotent.
        store.ensure_dir().await.unwrap();
    }
}
