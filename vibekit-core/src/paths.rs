//! Local media path helpers.
//!
//! Mobile sandboxes hand the app a documents directory; media caches and temporary copies
//! live in the sibling `Library` directory so they are not exposed through file sharing.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::error::StoreResult;

const LIBRARY_DIRNAME: &str = "Library";
const DEFAULT_MEDIA_EXTENSION: &str = "jpg";

/// Paths for local media artifacts under `<documents>/../Library`.
#[derive(Debug, Clone, uniffi::Object)]
pub struct MediaPaths {
    documents_dir: PathBuf,
    library_dir: PathBuf,
}

impl MediaPaths {
    /// Builds media paths for the app's documents directory.
    #[must_use]
    pub fn new(documents_dir: impl AsRef<Path>) -> Self {
        let documents_dir = documents_dir.as_ref().to_path_buf();
        let library_dir = normalize(&documents_dir.join("..").join(LIBRARY_DIRNAME));
        Self {
            documents_dir,
            library_dir,
        }
    }

    /// Returns the documents directory.
    #[must_use]
    pub fn documents_dir(&self) -> &Path {
        &self.documents_dir
    }

    /// Returns the library directory.
    #[must_use]
    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Returns `<library>/<filename>`, creating the library directory if needed.
    ///
    /// With `is_directory`, `<library>/<filename>` itself is created as a directory too.
    ///
    /// # Errors
    /// Returns an IO error if a directory cannot be created.
    pub fn local_file_path(&self, filename: &str, is_directory: bool) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.library_dir)?;
        let path = self.library_dir.join(filename);
        if is_directory {
            std::fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    /// Returns a fresh `<library>/<dirname>/<random>.<ext>` path, creating the directory.
    ///
    /// Dots in `ext` are dropped, so `".png"` and `"png"` are equivalent.
    ///
    /// # Errors
    /// Returns an IO error if the directory cannot be created.
    pub fn media_temp_path(&self, dirname: &str, ext: Option<&str>) -> io::Result<PathBuf> {
        let dir = self.local_file_path(dirname, true)?;
        let ext = ext.unwrap_or(DEFAULT_MEDIA_EXTENSION).replace('.', "");
        Ok(dir.join(format!("{}.{ext}", Uuid::new_v4().simple())))
    }
}

/// Resolves `.` and `..` components lexically, without touching the filesystem.
///
/// Leading `..` of a relative path are kept; `..` directly under the root is dropped.
fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }
    if components.is_empty() {
        PathBuf::from(".")
    } else {
        components.iter().collect()
    }
}

#[uniffi::export]
impl MediaPaths {
    /// Builds media paths for the app's documents directory.
    #[uniffi::constructor]
    #[must_use]
    pub fn from_documents_dir(documents_dir: String) -> Self {
        Self::new(PathBuf::from(documents_dir))
    }

    /// Returns the library directory as a string.
    #[must_use]
    pub fn library_dir_string(&self) -> String {
        self.library_dir.to_string_lossy().to_string()
    }

    /// Returns `<library>/<filename>` as a string, creating directories as needed.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if a directory cannot be created.
    pub fn local_file_path_string(
        &self,
        filename: &str,
        is_directory: bool,
    ) -> StoreResult<String> {
        Ok(self
            .local_file_path(filename, is_directory)?
            .to_string_lossy()
            .to_string())
    }

    /// Returns a fresh temporary media file name as a string.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn media_temp_filename(&self, dirname: &str, ext: Option<String>) -> StoreResult<String> {
        Ok(self
            .media_temp_path(dirname, ext.as_deref())?
            .to_string_lossy()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{normalize, MediaPaths};

    #[test]
    fn test_library_is_sibling_of_documents() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = MediaPaths::new(root.path().join("Documents"));

        assert_eq!(paths.library_dir(), root.path().join("Library"));
        assert_eq!(paths.documents_dir(), root.path().join("Documents"));
        assert_eq!(
            paths.library_dir_string(),
            root.path().join("Library").to_string_lossy()
        );
    }

    #[test]
    fn test_local_file_path_creates_directories() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = MediaPaths::new(root.path().join("Documents"));

        let file = paths.local_file_path("avatar.png", false).expect("path");
        assert_eq!(file, root.path().join("Library").join("avatar.png"));
        assert!(paths.library_dir().is_dir());
        assert!(!file.exists());

        let dir = paths.local_file_path("thumbs", true).expect("path");
        assert!(dir.is_dir());
    }

    #[test]
    fn test_media_temp_filename() {
        let root = tempfile::tempdir().expect("tempdir");
        let paths = MediaPaths::new(root.path().join("Documents"));

        let jpg = paths.media_temp_path("uploads", None).expect("path");
        assert_eq!(jpg.parent(), Some(root.path().join("Library").join("uploads").as_path()));
        assert_eq!(jpg.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert!(jpg.parent().is_some_and(std::path::Path::is_dir));

        let png = paths
            .media_temp_filename("uploads", Some(".png".to_string()))
            .expect("path");
        assert!(png.ends_with(".png"));
        assert!(!png.ends_with("..png"));

        let other = paths.media_temp_path("uploads", None).expect("path");
        assert_ne!(jpg, other);
    }

    #[test]
    fn test_library_dir_resolves_dot_components() {
        assert_eq!(MediaPaths::new(".").library_dir(), Path::new("../Library"));
        assert_eq!(
            MediaPaths::new("/data/app/Documents/sub/..").library_dir(),
            Path::new("/data/app/Library")
        );
        assert_eq!(
            MediaPaths::new("/data/app/Documents/").library_dir(),
            Path::new("/data/app/Library")
        );
        assert_eq!(MediaPaths::new("/").library_dir(), Path::new("/Library"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../../x")), PathBuf::from("../../x"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }
}
