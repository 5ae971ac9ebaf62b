use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Bytes of randomness in a generated name; hex-encoded to 32 characters.
const TOKEN_BYTES: usize = 16;

/// Extensions kept on stored names, compared case-insensitively.
const ALLOWED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Empty filename")]
    EmptyFilename,
    #[error("File too large (limit {0} bytes)")]
    FileTooLarge(usize),
    #[error("Multipart error: {0}")]
    Multipart(String),
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file part pulled out of a multipart form, not yet written to disk.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub original_filename: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Clone)]
pub struct UploadStore {
    upload_dir: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(upload_dir: impl Into<PathBuf>, max_file_size: usize) -> Result<Self, StorageError> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir)?;
        Ok(Self {
            upload_dir,
            max_file_size,
        })
    }

    #[cfg(test)]
    pub fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn generate_file_name(original_filename: &str) -> String {
        let token: [u8; TOKEN_BYTES] = rand::random();
        format!(
            "{}{}",
            hex::encode(token),
            Self::extract_file_extension(original_filename)
        )
    }

    /// Extension of the last path component including its dot, or `""`.
    /// Leading dots do not start an extension (`.bashrc` has none), and
    /// anything outside the image allow-list is dropped.
    pub fn extract_file_extension(original_filename: &str) -> &str {
        let base = original_filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_filename);
        let stem_start = base.len() - base.trim_start_matches('.').len();

        match base.rfind('.') {
            Some(idx) if idx > stem_start => {
                let ext = &base[idx..];
                if ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| ext[1..].eq_ignore_ascii_case(allowed))
                {
                    ext
                } else {
                    ""
                }
            }
            _ => "",
        }
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), StorageError> {
        if size > self.max_file_size {
            return Err(StorageError::FileTooLarge(self.max_file_size));
        }
        Ok(())
    }

    pub fn store(&self, upload: &FileUpload) -> Result<StoredUpload, StorageError> {
        if upload.original_filename.is_empty() {
            return Err(StorageError::EmptyFilename);
        }
        self.validate_file_size(upload.data.len())?;

        let name = Self::generate_file_name(&upload.original_filename);
        let path = self.upload_dir.join(&name);
        fs::write(&path, &upload.data)?;

        log::info!(
            "Stored upload {:?} as {} ({} bytes)",
            upload.original_filename,
            name,
            upload.data.len()
        );
        Ok(StoredUpload { name, path })
    }

    /// Maps a public name to a path inside the upload directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        let path = self.upload_dir.join(name);
        if !path.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    pub fn retrieve(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::Io(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, UploadStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(temp_dir.path().join("uploads"), 1024).unwrap();
        (temp_dir, store)
    }

    fn upload(name: &str, data: &[u8]) -> FileUpload {
        FileUpload {
            original_filename: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_new_creates_directory_idempotently() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("a").join("b");
        UploadStore::new(&dir, 10).unwrap();
        UploadStore::new(&dir, 10).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_extract_file_extension() {
        assert_eq!(UploadStore::extract_file_extension("insulator.jpg"), ".jpg");
        assert_eq!(UploadStore::extract_file_extension("IMG_01.JPEG"), ".JPEG");
        assert_eq!(UploadStore::extract_file_extension("pole.v2.webp"), ".webp");
        assert_eq!(UploadStore::extract_file_extension("noext"), "");
        assert_eq!(UploadStore::extract_file_extension(".bashrc"), "");
        assert_eq!(UploadStore::extract_file_extension("..hidden"), "");
        assert_eq!(UploadStore::extract_file_extension("trailing."), "");
        assert_eq!(UploadStore::extract_file_extension("dir.d/photo"), "");
        assert_eq!(UploadStore::extract_file_extension("C:\\pics\\pole.png"), ".png");
        assert_eq!(UploadStore::extract_file_extension(".profile.png"), ".png");
    }

    #[test]
    fn test_unexpected_extension_is_dropped() {
        assert_eq!(UploadStore::extract_file_extension("x.p%2fng"), "");
        assert_eq!(UploadStore::extract_file_extension("x.jp g"), "");
        assert_eq!(UploadStore::extract_file_extension("archive.tar.gz"), "");
        assert_eq!(UploadStore::extract_file_extension("polyglot.html"), "");
        assert_eq!(UploadStore::extract_file_extension("x.SVG"), "");
    }

    #[test]
    fn test_generated_name_shape() {
        let name = UploadStore::generate_file_name("pole.png");
        assert_eq!(name.len(), 32 + ".png".len());
        assert!(name.ends_with(".png"));
        assert!(name[..32].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_store_then_retrieve_round_trip() {
        let (_dir, store) = test_store();
        let data = b"\x89PNG\r\n\x1a\nnot really";
        let stored = store.store(&upload("pole.png", data)).unwrap();

        assert!(stored.path.starts_with(store.upload_dir()));
        assert_eq!(store.retrieve(&stored.name).unwrap(), data.to_vec());
    }

    #[test]
    fn test_two_stores_never_collide() {
        let (_dir, store) = test_store();
        let first = store.store(&upload("a.jpg", b"one")).unwrap();
        let second = store.store(&upload("a.jpg", b"two")).unwrap();
        assert_ne!(first.name, second.name);
        assert_eq!(store.retrieve(&first.name).unwrap(), b"one");
        assert_eq!(store.retrieve(&second.name).unwrap(), b"two");
    }

    #[test]
    fn test_store_rejects_empty_filename() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.store(&upload("", b"data")),
            Err(StorageError::EmptyFilename)
        ));
    }

    #[test]
    fn test_store_rejects_oversized() {
        let (_dir, store) = test_store();
        let data = vec![0u8; 1025];
        assert!(matches!(
            store.store(&upload("big.jpg", &data)),
            Err(StorageError::FileTooLarge(1024))
        ));
    }

    #[test]
    fn test_retrieve_missing() {
        let (_dir, store) = test_store();
        assert!(matches!(
            store.retrieve("0123456789abcdef0123456789abcdef.jpg"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_path_separators() {
        let (_dir, store) = test_store();
        for name in ["../secret", "a/b", "a\\b", "..", ".", ""] {
            assert!(
                matches!(store.resolve(name), Err(StorageError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
