use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SEARCH_RESULTS_PLACEHOLDER: &str = "$search_results$";
pub const QUERY_PLACEHOLDER: &str = "$query$";

/// Default retrieval-augmented prompt.
pub const DEFAULT_TEMPLATE: &str = "Use the following search results to answer the question. \
If the results do not contain the answer, say so.\n\n\
Search results:\n$search_results$\n\n\
Question: $query$";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "d_template")]
    pub template: String,
    /// When set, the template is read from this file instead.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: d_template(),
            template_path: None,
        }
    }
}

fn d_template() -> String {
    DEFAULT_TEMPLATE.into()
}
