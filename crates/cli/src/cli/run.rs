//! `parley run`: one-shot execution command.
//!
//! Submits a single message (with optional attachments), streams the
//! response to stdout, and exits. Useful for scripting and piping.

use std::io::Write;
use std::path::PathBuf;

use futures_util::StreamExt;

use pl_domain::config::Config;
use pl_domain::turn::{last_text_index, Completion, RawTurn};
use pl_sessions::presentation;

use crate::bootstrap;
use crate::cli::printer::StreamPrinter;

/// Execute one generation and print the response.
///
/// Exits with code 1 when the backend fails.
pub async fn run(
    config: Config,
    message: String,
    attachments: Vec<PathBuf>,
    use_retrieval: bool,
    json_output: bool,
) -> anyhow::Result<()> {
    let runtime = bootstrap::build_runtime(config, use_retrieval).await?;
    let session = runtime.session();

    session.submit(&message, &attachments)?;
    let mut stream = session.generate().await?;

    let mut printer = StreamPrinter::default();
    let mut latest = String::new();
    let mut failure: Option<String> = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(display) => {
                if !json_output {
                    if let Some(text) = printer.update(&display) {
                        print!("{text}");
                        std::io::stdout().flush().ok();
                    }
                }
                latest = display;
            }
            Err(e) => failure = Some(e.to_string()),
        }
    }

    let log = session.snapshot();
    if json_output {
        println!("{}", render_json(&log, failure.as_deref())?);
    } else {
        if let Some(text) = printer.finish(&latest) {
            print!("{text}");
        }
        println!();
        if let Some(message) = &failure {
            eprintln!("error: {message}");
        }
    }

    if failure.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

/// Final response, completion and raw log as pretty JSON.
fn render_json(log: &[RawTurn], error: Option<&str>) -> anyhow::Result<String> {
    let turn = last_text_index(log).map(|i| &log[i]);
    let raw = turn
        .and_then(|t| t.response.as_ref())
        .map(|r| r.as_text().to_string())
        .unwrap_or_default();
    let completion = turn.and_then(|t| t.completion).unwrap_or(Completion::Failed);

    let body = serde_json::json!({
        "response": presentation::present(&raw),
        "raw_response": raw,
        "completion": completion,
        "error": error,
        "log": log,
    });
    serde_json::to_string_pretty(&body).map_err(|e| anyhow::anyhow!("serializing output: {e}"))
}
