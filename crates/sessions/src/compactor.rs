//! Raw interaction log → `(query, history)` conversion.
//!
//! Attachments are folded into the text turn that follows them: images become
//! numbered `<img>` markers, documents become their extracted text. Synthetic
//! artifact turns are skipped.

use pl_domain::error::{Error, Result};
use pl_domain::trace::TraceEvent;
use pl_domain::turn::{AttachmentKind, History, InputPart, RawTurn};
use pl_providers::traits::DocumentLoader;
use std::path::Path;
use std::sync::Arc;

pub struct HistoryCompactor {
    loader: Arc<dyn DocumentLoader>,
}

impl HistoryCompactor {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }

    /// Flatten `raw_log` into the pending query and the completed pairs
    /// before it.
    ///
    /// Fails with `InvalidState` for an empty log, a log without text turns,
    /// or attachments left after the last text turn. A missing attachment
    /// file is `NotFound`.
    pub async fn compact(&self, raw_log: &[RawTurn]) -> Result<(String, History)> {
        if raw_log.is_empty() {
            return Err(Error::InvalidState("interaction log is empty".into()));
        }

        let mut pairs: History = Vec::new();
        let mut acc = String::new();
        let mut dangling_attachments = 0usize;
        let mut picture_no = 0usize;

        for turn in raw_log {
            match &turn.input {
                None => continue,
                Some(InputPart::Attachment { path, kind }) => {
                    let context = match kind {
                        AttachmentKind::Image => {
                            picture_no += 1;
                            image_marker(picture_no, path)
                        }
                        AttachmentKind::Document => self.loader.load(path).await?,
                        AttachmentKind::Other => {
                            tracing::warn!(path = %path.display(), "unsupported attachment, ignoring");
                            TraceEvent::AttachmentSkipped {
                                path: path.display().to_string(),
                                reason: "unsupported attachment type".into(),
                            }
                            .emit();
                            String::new()
                        }
                    };
                    acc.push_str(&context);
                    acc.push('\n');
                    dangling_attachments += 1;
                }
                Some(InputPart::Text(text)) => {
                    acc.push_str(text);
                    let response = turn
                        .response
                        .as_ref()
                        .map(|r| r.as_text().to_string())
                        .unwrap_or_default();
                    pairs.push((std::mem::take(&mut acc), response));
                    dangling_attachments = 0;
                }
            }
        }

        if dangling_attachments > 0 {
            return Err(Error::InvalidState(format!(
                "{dangling_attachments} attachment(s) after the last text turn"
            )));
        }
        let (query, _) = pairs
            .pop()
            .ok_or_else(|| Error::InvalidState("interaction log has no text turn".into()))?;

        tracing::debug!(pairs = pairs.len(), query_chars = query.len(), "log compacted");
        Ok((query, pairs))
    }
}

fn image_marker(n: usize, path: &Path) -> String {
    format!("Picture {n}: <img>{}</img>", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_domain::turn::{Completion, Response};

    /// Loader that echoes the file name, or fails for names starting with `missing`.
    struct EchoLoader;

    #[async_trait::async_trait]
    impl DocumentLoader for EchoLoader {
        async fn load(&self, path: &Path) -> Result<String> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name.starts_with("missing") {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Ok(format!("contents of {name}"))
        }
    }

    fn compactor() -> HistoryCompactor {
        HistoryCompactor::new(Arc::new(EchoLoader))
    }

    fn answered(q: &str, r: &str) -> RawTurn {
        RawTurn {
            response: Some(Response::text(r)),
            completion: Some(Completion::Finished),
            ..RawTurn::text(q)
        }
    }

    #[tokio::test]
    async fn single_pending_turn() {
        let (query, history) = compactor().compact(&[RawTurn::text("hi")]).await.unwrap();
        assert_eq!(query, "hi");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn history_excludes_final_turn() {
        let log = vec![answered("q1", "r1"), answered("q2", "r2"), RawTurn::text("q3")];
        let (query, history) = compactor().compact(&log).await.unwrap();
        assert_eq!(query, "q3");
        assert_eq!(
            history,
            vec![("q1".to_string(), "r1".to_string()), ("q2".to_string(), "r2".to_string())]
        );
    }

    #[tokio::test]
    async fn attachment_context_prefixes_query() {
        let log = vec![RawTurn::attachment("docs/a.txt"), RawTurn::text("hi")];
        let (query, history) = compactor().compact(&log).await.unwrap();
        assert_eq!(query, "contents of a.txt\nhi");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn images_are_numbered_across_the_log() {
        let log = vec![
            RawTurn::attachment("one.png"),
            answered("what is this?", "a cat"),
            RawTurn::attachment("two.jpg"),
            RawTurn::text("and this?"),
        ];
        let (query, history) = compactor().compact(&log).await.unwrap();
        assert_eq!(history[0].0, "Picture 1: <img>one.png</img>\nwhat is this?");
        assert_eq!(query, "Picture 2: <img>two.jpg</img>\nand this?");
    }

    #[tokio::test]
    async fn unsupported_attachment_gives_empty_context() {
        let log = vec![RawTurn::attachment("song.mp3"), RawTurn::text("hi")];
        let (query, _) = compactor().compact(&log).await.unwrap();
        assert_eq!(query, "\nhi");
    }

    #[tokio::test]
    async fn artifact_turns_are_skipped() {
        let log = vec![
            answered("draw it", "<box>(1,1),(2,2)</box>"),
            RawTurn::artifact("annotated.png"),
            RawTurn::text("thanks"),
        ];
        let (query, history) = compactor().compact(&log).await.unwrap();
        assert_eq!(query, "thanks");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn pending_middle_turn_has_empty_response() {
        let log = vec![RawTurn::text("first"), RawTurn::text("second")];
        let (_, history) = compactor().compact(&log).await.unwrap();
        assert_eq!(history, vec![("first".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn empty_log_is_invalid_state() {
        let err = compactor().compact(&[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn attachments_only_is_invalid_state() {
        let err = compactor()
            .compact(&[RawTurn::attachment("a.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn trailing_attachment_is_invalid_state() {
        let log = vec![RawTurn::text("q"), RawTurn::attachment("late.png")];
        let err = compactor().compact(&log).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let log = vec![RawTurn::attachment("missing.txt"), RawTurn::text("q")];
        let err = compactor().compact(&log).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
