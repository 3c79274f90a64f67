use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Broad classification of an attached file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "markdown", "rst", "csv", "json", "html"];

impl AttachmentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            AttachmentKind::Image
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            AttachmentKind::Document
        } else {
            AttachmentKind::Other
        }
    }
}

/// One part of a user submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputPart {
    Text(String),
    Attachment { path: PathBuf, kind: AttachmentKind },
}

impl InputPart {
    pub fn text(text: impl Into<String>) -> Self {
        InputPart::Text(text.into())
    }

    pub fn attachment(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = AttachmentKind::from_path(&path);
        InputPart::Attachment { path, kind }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            InputPart::Text(text) => Some(text),
            InputPart::Attachment { .. } => None,
        }
    }
}

/// What the assistant produced for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Text(String),
    /// Auxiliary non-text payload, e.g. an annotated image on disk.
    Artifact(PathBuf),
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Response::Text(text.into())
    }

    /// Text view of the response. Artifacts render as an empty string.
    pub fn as_text(&self) -> &str {
        match self {
            Response::Text(text) => text,
            Response::Artifact(_) => "",
        }
    }
}

/// How a stored response came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    Finished,
    Stopped,
    /// The backend failed mid-generation; the response is incomplete.
    Failed,
}

/// One entry of the raw interaction log.
///
/// Attachment turns never carry a response. Synthetic artifact turns have no
/// input and exist only to surface post-processing output after a reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawTurn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
}

impl RawTurn {
    /// A pending text turn (no response yet).
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: Some(InputPart::text(text)),
            response: None,
            completion: None,
        }
    }

    pub fn attachment(path: impl Into<PathBuf>) -> Self {
        Self {
            input: Some(InputPart::attachment(path)),
            response: None,
            completion: None,
        }
    }

    pub fn artifact(path: impl Into<PathBuf>) -> Self {
        Self {
            input: None,
            response: Some(Response::Artifact(path.into())),
            completion: Some(Completion::Finished),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.input, Some(InputPart::Text(_)))
    }

    pub fn is_artifact(&self) -> bool {
        self.input.is_none()
    }

    /// Text turn still waiting for a response.
    pub fn is_pending(&self) -> bool {
        self.is_text() && self.response.is_none()
    }
}

/// Flattened (query, response) pairs as a generation backend consumes them.
pub type History = Vec<(String, String)>;

/// Index of the last text turn in `log`, if any.
pub fn last_text_index(log: &[RawTurn]) -> Option<usize> {
    log.iter().rposition(RawTurn::is_text)
}

// ── Retrieval data ─────────────────────────────────────────────────

/// A raw document submitted for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A retrievable slice of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

pub const DEFAULT_CHUNK_SIZE: usize = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_kind_by_extension() {
        assert_eq!(AttachmentKind::from_path(Path::new("a/cat.PNG")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::from_path(Path::new("notes.md")), AttachmentKind::Document);
        assert_eq!(AttachmentKind::from_path(Path::new("report.pdf")), AttachmentKind::Document);
        assert_eq!(AttachmentKind::from_path(Path::new("song.mp3")), AttachmentKind::Other);
        assert_eq!(AttachmentKind::from_path(Path::new("Makefile")), AttachmentKind::Other);
    }

    #[test]
    fn pending_and_artifact_flags() {
        let t = RawTurn::text("hi");
        assert!(t.is_text());
        assert!(t.is_pending());

        let a = RawTurn::attachment("x.png");
        assert!(!a.is_text());
        assert!(!a.is_pending());

        let art = RawTurn::artifact("out.png");
        assert!(art.is_artifact());
        assert!(!art.is_pending());
    }

    #[test]
    fn last_text_index_skips_artifacts() {
        let log = vec![
            RawTurn::attachment("a.png"),
            RawTurn::text("q"),
            RawTurn::artifact("ann.png"),
        ];
        assert_eq!(last_text_index(&log), Some(1));
        assert_eq!(last_text_index(&[]), None);
    }

    #[test]
    fn raw_turn_json_shape() {
        let t = RawTurn::text("hello");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["input"]["text"], "hello");
        assert!(json.get("response").is_none());

        let back: RawTurn = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn document_ids_are_unique() {
        let a = Document::new("x");
        let b = Document::new("x");
        assert_ne!(a.id, b.id);
        assert!(a.source.is_none());
        assert_eq!(b.with_source("f.txt").source.as_deref(), Some("f.txt"));
    }
}
