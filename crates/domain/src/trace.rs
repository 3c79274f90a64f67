use serde::Serialize;

/// Structured trace events emitted across all parley crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    DocumentsIndexed {
        documents: usize,
        chunks: usize,
        duration_ms: u64,
    },
    ChunksRetrieved {
        query_chars: usize,
        requested: usize,
        returned: usize,
    },
    PromptAugmented {
        chunks: usize,
        prompt_chars: usize,
    },
    GenerationStarted {
        session_id: String,
        backend: String,
        history_pairs: usize,
        query_chars: usize,
    },
    GenerationFinished {
        session_id: String,
        completion: String,
        response_chars: usize,
        chunks: usize,
        duration_ms: u64,
    },
    SessionReset {
        session_id: String,
        dropped_turns: usize,
    },
    AttachmentSkipped {
        path: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pl_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::ChunksRetrieved {
            query_chars: 17,
            requested: 4,
            returned: 1,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "ChunksRetrieved");
        assert_eq!(json["returned"], 1);
    }
}
