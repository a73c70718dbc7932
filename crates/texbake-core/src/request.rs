//! Compile requests.
//!
//! A request is either a path to a document on disk, whose sibling files may
//! be staged alongside it, or an upload carrying raw bytes and a declared file
//! name. Both constructors validate the file name, so every `CompileRequest`
//! names a markup file.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;

use crate::error::{Error, Result};

/// Extensions accepted as markup sources (compared case-insensitively).
pub const MARKUP_EXTENSIONS: &[&str] = &["tex", "latex"];

/// Extension of the produced artifact.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Where the markup content comes from.
pub enum SourceInput {
    /// A document on disk. Sibling auxiliary files are staged too.
    Path(PathBuf),

    /// Uploaded content. No sibling directory is available.
    Upload(Box<dyn AsyncRead + Send + Unpin>),
}

impl fmt::Debug for SourceInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            SourceInput::Upload(_) => f.write_str("Upload(..)"),
        }
    }
}

/// A validated request to compile one markup document.
#[derive(Debug)]
pub struct CompileRequest {
    file_name: String,
    input: SourceInput,
}

impl CompileRequest {
    /// Request compilation of a document on disk.
    ///
    /// Only the extension is checked here; whether the file exists is
    /// checked when the request is compiled.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("'{}' does not name a file", path.display()))
            })?
            .to_string();
        validate_file_name(&file_name)?;

        Ok(Self {
            file_name,
            input: SourceInput::Path(path),
        })
    }

    /// Request compilation of in-memory content.
    pub fn from_bytes(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<Self> {
        let cursor = std::io::Cursor::new(content.into());
        Self::from_reader(file_name, cursor)
    }

    /// Request compilation of streamed content, such as an HTTP upload body.
    pub fn from_reader<R>(file_name: impl Into<String>, reader: R) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let file_name = file_name.into();
        validate_upload_name(&file_name)?;

        Ok(Self {
            file_name,
            input: SourceInput::Upload(Box::new(reader)),
        })
    }

    /// Base file name the source is staged under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// File name of the artifact the engine is expected to produce.
    pub fn artifact_name(&self) -> String {
        artifact_name_for(&self.file_name)
    }

    /// The path of the source on disk, for path requests.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.input {
            SourceInput::Path(path) => Some(path),
            SourceInput::Upload(_) => None,
        }
    }

    pub(crate) fn into_input(self) -> (String, SourceInput) {
        (self.file_name, self.input)
    }
}

/// Whether `file_name` ends in a markup extension (case-insensitive).
pub fn is_markup_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// `resume.TeX` -> `resume.pdf`.
pub fn artifact_name_for(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension(ARTIFACT_EXTENSION)
        .to_string_lossy()
        .into_owned()
}

fn validate_file_name(file_name: &str) -> Result<()> {
    // The name is the engine's last argument and must not read as a flag.
    if file_name.starts_with('-') {
        return Err(Error::InvalidInput(format!(
            "input filename must not start with '-': '{file_name}'"
        )));
    }

    if is_markup_file(file_name) {
        return Ok(());
    }

    let found = Path::new(file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| "no extension".to_string());
    Err(Error::InvalidInput(format!(
        "input file must be a .tex or .latex file, got: {found}"
    )))
}

fn validate_upload_name(file_name: &str) -> Result<()> {
    if file_name.is_empty() {
        return Err(Error::InvalidInput("upload must have a filename".to_string()));
    }

    let is_bare = !file_name.contains(['/', '\\'])
        && !matches!(file_name, "." | "..")
        && !file_name.contains('\0');
    if !is_bare {
        return Err(Error::InvalidInput(format!(
            "upload filename must not contain a path: '{file_name}'"
        )));
    }

    validate_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_extensions() {
        assert!(is_markup_file("resume.tex"));
        assert!(is_markup_file("Resume.TEX"));
        assert!(is_markup_file("thesis.LaTeX"));
        assert!(!is_markup_file("notes.md"));
        assert!(!is_markup_file("tex"));
        assert!(!is_markup_file("archive.tex.gz"));
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name_for("resume.tex"), "resume.pdf");
        assert_eq!(artifact_name_for("Resume.TEX"), "Resume.pdf");
        assert_eq!(artifact_name_for("cv.v2.latex"), "cv.v2.pdf");
    }

    #[test]
    fn test_from_path() {
        let request = CompileRequest::from_path("/docs/cv.tex").unwrap();
        assert_eq!(request.file_name(), "cv.tex");
        assert_eq!(request.artifact_name(), "cv.pdf");
        assert_eq!(request.source_path(), Some(Path::new("/docs/cv.tex")));

        let err = CompileRequest::from_path("/docs/cv.docx").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains(".docx"));

        let err = CompileRequest::from_path("/").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = CompileRequest::from_path("/docs/-output-directory=tmp.tex").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_from_bytes() {
        let request = CompileRequest::from_bytes("upload.latex", "\\relax").unwrap();
        assert_eq!(request.file_name(), "upload.latex");
        assert!(request.source_path().is_none());
    }

    #[test]
    fn test_upload_name_validation() {
        for bad in [
            "",
            "../evil.tex",
            "dir/doc.tex",
            "dir\\doc.tex",
            "doc.txt",
            "-jobname=x.tex",
            "--shell-escape.tex",
        ] {
            let err = CompileRequest::from_bytes(bad, Vec::new()).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {bad:?}");
        }
    }
}
