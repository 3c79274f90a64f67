//! Filesystem document loader.

use crate::pdf;
use crate::traits::DocumentLoader;
use pl_domain::error::{Error, Result};
use pl_domain::trace::TraceEvent;
use std::path::Path;

/// Extensions read verbatim as UTF-8 text.
const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst", "csv", "json", "html"];

/// Reads documents from disk with `tokio::fs`.
///
/// Plain text is read verbatim and PDFs go through text extraction. Other
/// types (images, office files, binaries) load as an empty string with a
/// warning. A path that is missing, not a file, or cannot be read or parsed
/// is [`Error::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct FsDocumentLoader {
    /// Upper bound on characters returned per file; `None` for unlimited.
    max_chars: Option<usize>,
}

impl FsDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            max_chars: Some(max_chars),
        }
    }

    pub fn is_plain_text(path: &Path) -> bool {
        has_extension(path, PLAIN_TEXT_EXTENSIONS)
    }

    pub fn is_pdf(path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    /// True for anything this loader returns real text for.
    pub fn is_supported(path: &Path) -> bool {
        Self::is_plain_text(path) || Self::is_pdf(path)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn unreadable(path: &Path, reason: impl std::fmt::Display) -> Error {
    Error::NotFound(format!("{} ({reason})", path.display()))
}

#[async_trait::async_trait]
impl DocumentLoader for FsDocumentLoader {
    async fn load(&self, path: &Path) -> Result<String> {
        let meta = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(unreadable(path, e)),
        };
        if !meta.is_file() {
            return Err(unreadable(path, "not a regular file"));
        }

        if !Self::is_supported(path) {
            tracing::warn!(path = %path.display(), "unsupported document type, using empty text");
            TraceEvent::AttachmentSkipped {
                path: path.display().to_string(),
                reason: "unsupported document type".into(),
            }
            .emit();
            return Ok(String::new());
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| unreadable(path, e))?;
        let mut text = if Self::is_pdf(path) {
            tokio::task::spawn_blocking(move || pdf::extract_text(bytes))
                .await
                .map_err(|e| unreadable(path, e))?
                .map_err(|e| unreadable(path, e))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if let Some(max) = self.max_chars {
            if let Some((cut, _)) = text.char_indices().nth(max) {
                text.truncate(cut);
            }
        }
        tracing::debug!(path = %path.display(), chars = text.len(), "document loaded");
        Ok(text)
    }
}
