use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where backends may write annotated images.
    #[serde(default = "d_annotations_dir")]
    pub annotations_dir: PathBuf,
    /// Buffer between the generation task and the consumer stream.
    #[serde(default = "d_64")]
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            annotations_dir: d_annotations_dir(),
            channel_capacity: 64,
        }
    }
}

fn d_annotations_dir() -> PathBuf {
    PathBuf::from("./annotations")
}
fn d_64() -> usize {
    64
}
