//! SSE streaming infrastructure for HTTP backends.
//!
//! Buffer response chunks, split on `\n\n`, extract `data:` payloads and feed
//! each payload to a backend-specific parser that returns text deltas.

use crate::util::from_reqwest;
use pl_domain::error::Result;
use pl_domain::stream::BoxStream;

/// Payload that terminates an OpenAI-style event stream.
pub(crate) const DONE_SENTINEL: &str = "[DONE]";

/// Extract complete `data:` payloads from an SSE buffer.
///
/// SSE events are delimited by `\n\n`.  Each event block may contain
/// `event:`, `data:`, `id:`, or `retry:` lines; only `data:` lines are kept.
///
/// The buffer is drained in-place: consumed bytes are removed and any
/// trailing partial event remains for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Build a text [`BoxStream`] from an SSE `reqwest::Response`.
///
/// `parse_data` maps one `data:` payload to zero or more text deltas. The
/// stream ends at the `[DONE]` sentinel or when the body closes, whichever
/// comes first. Transport errors are yielded once and end the stream.
pub(crate) fn sse_text_stream<F>(
    response: reqwest::Response,
    mut parse_data: F,
) -> BoxStream<'static, Result<String>>
where
    F: FnMut(&str) -> Vec<Result<String>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();

        'outer: loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));

                    for data in drain_data_lines(&mut buffer) {
                        if data == DONE_SENTINEL {
                            break 'outer;
                        }
                        for delta in parse_data(&data) {
                            yield delta;
                        }
                    }
                }
                Ok(None) => {
                    // Body closed: flush a trailing event that lacked its delimiter.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for data in drain_data_lines(&mut buffer) {
                            if data == DONE_SENTINEL {
                                break;
                            }
                            for delta in parse_data(&data) {
                                yield delta;
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
