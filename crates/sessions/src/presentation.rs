//! Display cleanup for partially streamed model output.
//!
//! Applied to text on its way to the caller only; the stored response keeps
//! the raw model output.

use regex::Regex;
use std::sync::OnceLock;

const FENCE: &str = "```";

/// `<box>…</box>` spans, plus an unterminated `<box>…` running to end of text.
fn box_span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"(?s)<box>.*?(?:</box>|\z)") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

fn ref_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"</?ref>") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

/// Full display transform for one relayed snapshot of the response.
pub fn present(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = strip_reference_tags(&text);
    normalize_fences(&text)
}

/// Drop `<ref>`/`</ref>` markers (keeping their contents) and remove
/// `<box>` coordinate spans entirely.
pub fn strip_reference_tags(text: &str) -> String {
    let without_boxes = box_span_regex().replace_all(text, "");
    ref_tag_regex().replace_all(&without_boxes, "").into_owned()
}

/// Trim fence lines and close a code block left open by a partial stream.
pub fn normalize_fences(text: &str) -> String {
    let mut fences = 0usize;
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with(FENCE) {
                fences += 1;
                trimmed
            } else {
                line
            }
        })
        .collect();

    let mut out = lines.join("\n");
    if fences % 2 == 1 {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(FENCE);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_untouched() {
        assert_eq!(present("Hello, world."), "Hello, world.");
    }

    #[test]
    fn crlf_normalized() {
        assert_eq!(present("a\r\nb"), "a\nb");
    }

    #[test]
    fn open_fence_is_closed() {
        let partial = "Here:\n  ```rust\nfn main() {";
        assert_eq!(present(partial), "Here:\n```rust\nfn main() {\n```");
    }

    #[test]
    fn balanced_fences_get_no_extra_close() {
        let full = "```\ncode\n```";
        assert_eq!(present(full), full);
    }

    #[test]
    fn trailing_newline_not_doubled_when_closing() {
        assert_eq!(present("```py\nx = 1\n"), "```py\nx = 1\n```");
    }

    #[test]
    fn ref_tags_removed_inner_text_kept() {
        assert_eq!(present("<ref>the cat</ref> sits"), "the cat sits");
    }

    #[test]
    fn box_spans_removed() {
        assert_eq!(
            present("<ref>cat</ref><box>(10,20),(30,40)</box> is here"),
            "cat is here"
        );
    }

    #[test]
    fn unterminated_box_removed() {
        assert_eq!(present("the dog<box>(1,2),(3"), "the dog");
    }

    #[test]
    fn idempotent_on_clean_output() {
        let once = present("<ref>x</ref>\n```\ncode");
        assert_eq!(present(&once), once);
    }
}
