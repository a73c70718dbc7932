//! Common types for the compilation pipeline.

/// PDF files start with this marker.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// A compiled document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name the engine wrote (e.g. `resume.pdf`).
    pub file_name: String,

    /// Full artifact contents.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Size of the artifact in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the artifact is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the contents start with the PDF magic header.
    pub fn has_pdf_header(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }

    /// Take the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Arguments for one engine pass over `file_name`.
///
/// Batch mode with `file:line:` error messages; `extra_args` go between the
/// fixed flags and the file name.
pub fn engine_args(file_name: &str, extra_args: &[String]) -> Vec<String> {
    let mut args = vec![
        "-interaction=nonstopmode".to_string(),
        "-file-line-error".to_string(),
    ];
    args.extend(extra_args.iter().cloned());
    args.push(file_name.to_string());
    args
}
