//! Loader: read the source markdown document from disk.
//!
//! The only side effect is one read-only filesystem access. Content is
//! assumed to be UTF-8; invalid byte sequences are replaced with U+FFFD and
//! logged rather than failing the conversion.

use crate::error::Md2PdfError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The markdown document being converted. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub content: String,
}

impl SourceDocument {
    /// Build a document from in-memory text. `path` is used only for the
    /// fallback title and for resolving relative links.
    pub fn from_text(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Directory containing the document, used as the page's base URL.
    pub fn base_dir(&self) -> Option<PathBuf> {
        let parent = self.path.parent()?;
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        std::fs::canonicalize(parent).ok()
    }

    /// The file stem, or `"document"` when the path has none.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Read `path` into a [`SourceDocument`].
///
/// # Errors
/// [`Md2PdfError::NotFound`] when the path does not exist, is not a regular
/// file, or cannot be read.
pub async fn load_document(path: impl AsRef<Path>) -> Result<SourceDocument, Md2PdfError> {
    let path = path.as_ref();

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| not_found(path, e.to_string()))?;
    if !meta.is_file() {
        return Err(not_found(path, "not a regular file".into()));
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| not_found(path, e.to_string()))?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                "{} is not valid UTF-8 (first bad byte at {}); invalid sequences replaced",
                path.display(),
                e.utf8_error().valid_up_to()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    debug!("Loaded {} ({} bytes)", path.display(), content.len());

    Ok(SourceDocument {
        path: path.to_path_buf(),
        content,
    })
}

fn not_found(path: &Path, detail: String) -> Md2PdfError {
    Md2PdfError::NotFound {
        path: path.to_path_buf(),
        detail,
    }
}
