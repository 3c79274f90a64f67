use pl_domain::config::{QUERY_PLACEHOLDER, SEARCH_RESULTS_PLACEHOLDER};
use pl_domain::turn::Chunk;

/// Render retrieved chunks as a numbered list, one per line.
pub fn format_search_results(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill `template` with the numbered search results and the query.
///
/// Substitution scans the template once, so placeholder text that appears
/// inside a chunk or inside the query is inserted verbatim and never expanded.
pub fn augment(query: &str, chunks: &[Chunk], template: &str) -> String {
    let results = format_search_results(chunks);
    substitute(template, &[(SEARCH_RESULTS_PLACEHOLDER, &results), (QUERY_PLACEHOLDER, query)])
}

fn substitute(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        if let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            for (placeholder, value) in pairs {
                if tail.starts_with(placeholder) {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                    continue 'scan;
                }
            }
            out.push('$');
            rest = &tail[1..];
        } else {
            out.push_str(rest);
            break;
        }
    }
    out
}

/// An augmentor bound to one configured template.
#[derive(Debug, Clone)]
pub struct PromptAugmentor {
    template: String,
}

impl PromptAugmentor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn augment_with(&self, query: &str, chunks: &[Chunk]) -> String {
        augment(query, chunks, &self.template)
    }
}
