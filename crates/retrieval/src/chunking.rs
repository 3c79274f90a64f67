/// Split `text` into non-overlapping chunks of at most `chunk_size` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily into a chunk,
/// joined by `"\n\n"`. A paragraph longer than `chunk_size` is cut at
/// character boundaries. Whitespace-only input yields no chunks. The result is
/// a pure function of its inputs.
pub fn split_into_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let normalized = text.replace("\r\n", "\n");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for paragraph in normalized.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_chars = paragraph.chars().count();

        if para_chars > chunk_size {
            flush(&mut chunks, &mut current, &mut current_chars);
            chunks.extend(hard_split(paragraph, chunk_size));
            continue;
        }

        let joined = if current.is_empty() {
            para_chars
        } else {
            current_chars + 2 + para_chars
        };
        if joined > chunk_size {
            flush(&mut chunks, &mut current, &mut current_chars);
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(paragraph);
        current_chars += para_chars;
    }
    flush(&mut chunks, &mut current, &mut current_chars);

    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_chars: &mut usize) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
    }
    *current_chars = 0;
}

/// Cut `text` every `chunk_size` characters, trimming each piece.
pub fn hard_split(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|c| c.iter().collect::<String>())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_into_chunks("Paris is the capital of France.", 300);
        assert_eq!(chunks, vec!["Paris is the capital of France."]);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(split_into_chunks("  \n\n \t ", 300).is_empty());
        assert!(split_into_chunks("", 300).is_empty());
    }

    #[test]
    fn paragraphs_are_packed_up_to_limit() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        // "aaaa\n\nbbbb" is 10 chars, adding "\n\ncccc" would be 16.
        let chunks = split_into_chunks(text, 10);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn long_paragraph_is_hard_split() {
        let text = "x".repeat(25);
        let chunks = split_into_chunks(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn splits_on_char_boundaries() {
        let text = "é".repeat(7);
        let chunks = split_into_chunks(&text, 3);
        assert_eq!(chunks, vec!["ééé", "ééé", "é"]);
    }

    #[test]
    fn crlf_is_normalized() {
        let chunks = split_into_chunks("one\r\n\r\ntwo", 4);
        assert_eq!(chunks, vec!["one", "two"]);
    }

    #[test]
    fn deterministic() {
        let text = "alpha beta gamma\n\ndelta epsilon\n\nzeta eta theta iota";
        assert_eq!(split_into_chunks(text, 20), split_into_chunks(text, 20));
    }
}
