use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for streaming generation output.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// How a backend's streamed text chunks relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Every yield carries the full text produced so far; the latest one
    /// replaces what was shown before.
    #[default]
    Cumulative,
    /// Every yield carries only the new text since the previous yield.
    Incremental,
}

impl StreamMode {
    /// Fold one backend yield into the visible text buffer.
    pub fn fold(self, visible: &mut String, chunk: &str) {
        match self {
            StreamMode::Cumulative => {
                visible.clear();
                visible.push_str(chunk);
            }
            StreamMode::Incremental => visible.push_str(chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_replaces() {
        let mut buf = String::new();
        StreamMode::Cumulative.fold(&mut buf, "He");
        StreamMode::Cumulative.fold(&mut buf, "Hello");
        assert_eq!(buf, "Hello");
    }

    #[test]
    fn incremental_appends() {
        let mut buf = String::new();
        StreamMode::Incremental.fold(&mut buf, "He");
        StreamMode::Incremental.fold(&mut buf, "llo");
        assert_eq!(buf, "Hello");
    }

    #[test]
    fn default_is_cumulative() {
        assert_eq!(StreamMode::default(), StreamMode::Cumulative);
    }
}
