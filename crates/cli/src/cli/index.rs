//! `parley index`: chunk and embed documents and report what was stored.
//!
//! The store is in-memory and discarded on exit; the command shows how
//! documents split and how many chunks the configured embedder produced.

use std::path::PathBuf;

use pl_domain::config::Config;
use pl_providers::FsDocumentLoader;
use pl_retrieval::IndexReport;

use crate::bootstrap;

pub async fn index(mut config: Config, paths: Vec<PathBuf>, json_output: bool) -> anyhow::Result<()> {
    bootstrap::resolve_prompt(&mut config)?;
    bootstrap::check_config(&config)?;

    let backend = bootstrap::build_backend(&config)?;
    let embedder = bootstrap::build_embedder(&config, &backend)?;
    let store = bootstrap::build_store(&config, embedder)?;

    let report = bootstrap::index_paths(&store, &FsDocumentLoader::new(), &paths).await?;
    if json_output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("serializing report: {e}"))?;
        println!("{json}");
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn render_report(report: &IndexReport) -> String {
    let mut out = String::new();
    for source in &report.sources {
        out.push_str(&format!(
            "{:>6} chunk(s) {:>9} chars  {}\n",
            source.chunks, source.chars, source.source
        ));
    }
    out.push_str(&format!(
        "{:>6} chunk(s) {:>9} chars  total ({} document(s))\n",
        report.total_chunks,
        report.total_chars,
        report.sources.len()
    ));
    out
}
