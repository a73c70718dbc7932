//! Per-request compilation workspaces.
//!
//! Every compile call gets its own directory:
//!
//! ```text
//! <workspace_root>/
//! └── texbake-<uuid>/     # removed when the Workspace is dropped
//!     ├── resume.tex      # staged source, original bytes
//!     ├── photo.png       # staged auxiliary files
//!     └── resume.pdf      # engine output
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::error::Result;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "texbake-";

/// Extensions of sibling files copied next to the source so the document can
/// reference them: images, nested PDFs, EPS graphics, bibliographies, classes,
/// packages and bibliography styles.
pub const AUXILIARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "pdf", "eps", "bib", "cls", "sty", "bst",
];

/// An exclusively owned scratch directory.
///
/// The directory and its contents are removed when the value is dropped,
/// whatever path the owning call returns through.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create a fresh, uniquely named workspace under `root`.
    ///
    /// `root` is created if missing. The workspace directory itself must not
    /// exist yet; a name collision is an error rather than a shared directory.
    pub async fn create(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let dir = root.join(format!("{}{}", WORKSPACE_PREFIX, Uuid::new_v4().simple()));
        tokio::fs::create_dir(&dir).await?;

        tracing::debug!("Created workspace {}", dir.display());
        Ok(Self { dir })
    }

    /// Path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of a file directly inside the workspace.
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Copy a source file into the workspace under `file_name`, byte for byte.
    pub async fn stage_file(&self, source: &Path, file_name: &str) -> Result<PathBuf> {
        let dest = self.file(file_name);
        tokio::fs::copy(source, &dest).await?;
        Ok(dest)
    }

    /// Drain `reader` into the workspace under `file_name`, byte for byte.
    pub async fn stage_reader<R>(&self, reader: &mut R, file_name: &str) -> Result<PathBuf>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let dest = self.file(file_name);
        let mut file = tokio::fs::File::create(&dest).await?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.sync_all().await?;

        tracing::debug!("Staged {} ({} bytes)", file_name, written);
        Ok(dest)
    }

    /// Copy the auxiliary files found directly in `source_dir`.
    ///
    /// Only regular files (or links to them) whose extension is in
    /// [`AUXILIARY_EXTENSIONS`] are copied; subdirectories are skipped. Names
    /// listed in `exclude` are never copied. Returns the staged file names.
    pub async fn stage_auxiliary(&self, source_dir: &Path, exclude: &[&str]) -> Result<Vec<String>> {
        let mut staged = Vec::new();
        let mut entries = tokio::fs::read_dir(source_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !is_auxiliary(&path) || exclude.contains(&name.as_str()) {
                continue;
            }

            // Follows symlinks, like a plain "is this a file" check would.
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }

            tokio::fs::copy(&path, self.file(&name)).await?;
            staged.push(name);
        }

        staged.sort();
        Ok(staged)
    }
}

// Removal stays synchronous so it also runs when a compile future is dropped
// mid-await.
impl Drop for Workspace {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!("Removed workspace {}", self.dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove workspace {}: {}", self.dir.display(), e),
        }
    }
}

/// Whether `path` has an extension from [`AUXILIARY_EXTENSIONS`].
pub fn is_auxiliary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| AUXILIARY_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_drop() {
        let root = TempDir::new().expect("Failed to create temp dir");

        let workspace = Workspace::create(root.path())
            .await
            .expect("Failed to create workspace");
        let dir = workspace.path().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir.file_name().unwrap().to_str().unwrap().starts_with(WORKSPACE_PREFIX));

        fs::write(workspace.file("doc.aux"), "x").unwrap();
        drop(workspace);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_unique_names() {
        let root = TempDir::new().expect("Failed to create temp dir");
        let a = Workspace::create(root.path()).await.unwrap();
        let b = Workspace::create(root.path()).await.unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_creates_missing_root() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("nested").join("root");
        let workspace = Workspace::create(&root).await.unwrap();
        assert!(workspace.path().starts_with(&root));
    }

    #[test]
    fn test_is_auxiliary() {
        assert!(is_auxiliary(Path::new("logo.PNG")));
        assert!(is_auxiliary(Path::new("refs.bib")));
        assert!(is_auxiliary(Path::new("custom.sty")));
        assert!(!is_auxiliary(Path::new("main.tex")));
        assert!(!is_auxiliary(Path::new("notes.txt")));
        assert!(!is_auxiliary(Path::new("Makefile")));
    }

    #[tokio::test]
    async fn test_stage_reader_preserves_bytes() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::create(root.path()).await.unwrap();

        let content = b"\\documentclass{article}\r\n\xe9t\xe9\n".to_vec();
        let staged = workspace
            .stage_reader(&mut content.as_slice(), "doc.tex")
            .await
            .unwrap();

        assert_eq!(fs::read(staged).unwrap(), content);
    }

    #[tokio::test]
    async fn test_stage_auxiliary_filters() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("main.tex"), "tex").unwrap();
        fs::write(source.path().join("logo.png"), "png").unwrap();
        fs::write(source.path().join("refs.BIB"), "bib").unwrap();
        fs::write(source.path().join("main.pdf"), "stale").unwrap();
        fs::write(source.path().join("notes.txt"), "txt").unwrap();
        fs::create_dir(source.path().join("figures.png")).unwrap();

        let root = TempDir::new().unwrap();
        let workspace = Workspace::create(root.path()).await.unwrap();
        let staged = workspace
            .stage_auxiliary(source.path(), &["main.pdf"])
            .await
            .unwrap();

        assert_eq!(staged, vec!["logo.png".to_string(), "refs.BIB".to_string()]);
        assert!(!workspace.file("main.tex").exists());
        assert!(!workspace.file("main.pdf").exists());
        assert!(!workspace.file("figures.png").exists());
    }
}
