//! Terminal rendering of a display-text stream.
//!
//! Each stream item is the full display text so far, and the display
//! transform can still rewrite the tail (a half-typed `<ref>` tag, an
//! auto-closed code fence). The printer only writes text that can no longer
//! change: everything before the last line, and before a trailing fence
//! line together with the line it closes.

/// Tracks what has been written for one response.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    /// New text to write for the latest display text, if any.
    pub fn update(&mut self, display: &str) -> Option<String> {
        let stable = &display[..stable_len(display)];
        self.advance(stable)
    }

    /// Remaining text once the stream has ended.
    ///
    /// When the final text no longer extends what was printed, the divergent
    /// tail is written on a fresh line.
    pub fn finish(&mut self, display: &str) -> Option<String> {
        if display.starts_with(self.printed.as_str()) {
            return self.advance(display);
        }
        let common = common_prefix_len(&self.printed, display);
        self.printed = display.to_string();
        Some(format!("\n{}", &display[common..]))
    }

    fn advance(&mut self, stable: &str) -> Option<String> {
        if stable.len() <= self.printed.len() || !stable.starts_with(self.printed.as_str()) {
            return None;
        }
        let new = stable[self.printed.len()..].to_string();
        self.printed = stable.to_string();
        Some(new)
    }
}

/// Byte length of the prefix of `display` that later items cannot rewrite.
fn stable_len(display: &str) -> usize {
    let Some(last_nl) = display.rfind('\n') else {
        return 0;
    };
    let last_line = &display[last_nl + 1..];
    if last_line.trim() != "```" {
        return last_nl + 1;
    }
    // Possibly an auto-closed fence: hold back the line it closes as well.
    display[..last_nl].rfind('\n').map_or(0, |i| i + 1)
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_back_incomplete_line() {
        let mut p = StreamPrinter::default();
        assert_eq!(p.update("Hel"), None);
        assert_eq!(p.update("Hello\nwor").as_deref(), Some("Hello\n"));
        assert_eq!(p.update("Hello\nworld"), None);
        assert_eq!(p.finish("Hello\nworld").as_deref(), Some("world"));
    }

    #[test]
    fn partial_tag_is_never_printed() {
        let mut p = StreamPrinter::default();
        assert_eq!(p.update("The <re"), None);
        assert_eq!(p.finish("The cat").as_deref(), Some("The cat"));
    }

    #[test]
    fn auto_closed_fence_holds_back_open_line() {
        let mut p = StreamPrinter::default();
        assert_eq!(
            p.update("Code:\n```rust\nfn\n```").as_deref(),
            Some("Code:\n```rust\n")
        );
        assert_eq!(p.update("Code:\n```rust\nfn main() {}\n```"), None);
        assert_eq!(
            p.finish("Code:\n```rust\nfn main() {}\n```").as_deref(),
            Some("fn main() {}\n```")
        );
    }

    #[test]
    fn finish_with_nothing_new() {
        let mut p = StreamPrinter::default();
        p.update("done\n");
        assert_eq!(p.finish("done\n"), None);
    }

    #[test]
    fn common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix_len("héllo", "hélp"), "hél".len());
        assert_eq!(common_prefix_len("abc", "abcdef"), 3);
        assert_eq!(common_prefix_len("", "x"), 0);
    }
}
