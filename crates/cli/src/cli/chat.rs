//! `parley chat`: interactive REPL command.
//!
//! Opens a readline-based loop that submits each line to a session and
//! streams the response back. Ctrl+C during a response stops the generation;
//! slash-commands cover attachments, regeneration, reset and indexing.

use std::io::Write;
use std::path::PathBuf;

use futures_util::StreamExt;

use pl_domain::config::Config;
use pl_domain::error::Result as PlResult;
use pl_domain::stream::BoxStream;
use pl_domain::turn::{Completion, InputPart, RawTurn, Response};
use pl_sessions::{presentation, GenerationSession};

use crate::bootstrap::{self, Runtime};
use crate::cli::printer::StreamPrinter;

/// REPL state that outlives a single line.
struct ChatContext {
    runtime: Runtime,
    session: GenerationSession,
    /// Attachments queued with `/attach` for the next message.
    pending: Vec<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
pub async fn chat(config: Config, use_retrieval: bool) -> anyhow::Result<()> {
    let runtime = bootstrap::build_runtime(config, use_retrieval).await?;
    let session = runtime.session();
    let mut ctx = ChatContext {
        runtime,
        session,
        pending: Vec::new(),
    };

    let mut rl = rustyline::DefaultEditor::new()?;

    // Banner goes to stderr so stdout carries only responses.
    eprintln!("parley interactive chat");
    eprintln!(
        "Model: {}  |  Retrieval: {}  |  Type /help for commands, Ctrl+D to exit",
        ctx.runtime.config.llm.model,
        if ctx.runtime.store.is_some() { "on" } else { "off" },
    );
    eprintln!();

    loop {
        let prompt = if ctx.pending.is_empty() {
            "you> ".to_string()
        } else {
            format!("you [{} attached]> ", ctx.pending.len())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                // ── Slash commands ────────────────────────────────
                if trimmed.starts_with('/') {
                    match handle_slash_command(trimmed, &mut ctx).await {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
                    }
                    continue;
                }

                // ── User message → generation ────────────────────
                let attachments = std::mem::take(&mut ctx.pending);
                if let Err(e) = send_message(&ctx.session, trimmed, &attachments).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command. Returns `true` if the REPL should exit.
async fn handle_slash_command(input: &str, ctx: &mut ChatContext) -> anyhow::Result<bool> {
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    };

    match cmd {
        "/exit" | "/quit" => return Ok(true),

        "/attach" => {
            if arg.is_empty() {
                eprintln!("Usage: /attach <path>");
            } else {
                let path = PathBuf::from(arg);
                if !path.exists() {
                    anyhow::bail!("{} does not exist", path.display());
                }
                ctx.pending.push(path);
                eprintln!("{} attachment(s) queued for the next message", ctx.pending.len());
            }
        }

        "/regen" => match ctx.session.regenerate().await? {
            Some(stream) => relay(&ctx.session, stream).await,
            None => eprintln!("Nothing to regenerate."),
        },

        "/reset" => {
            ctx.session.reset()?;
            ctx.pending.clear();
            eprintln!("Conversation cleared.");
        }

        "/index" => {
            let Some(store) = &ctx.runtime.store else {
                anyhow::bail!("retrieval is off; enable [retrieval] in the config and drop --no-rag");
            };
            let paths: Vec<PathBuf> = arg.split_whitespace().map(PathBuf::from).collect();
            if paths.is_empty() {
                eprintln!("Usage: /index <path>...");
            } else {
                let report = bootstrap::index_paths(store, &*ctx.runtime.loader, &paths).await?;
                eprintln!(
                    "Indexed {} chunk(s) from {} document(s).",
                    report.total_chunks,
                    report.sources.len()
                );
            }
        }

        "/history" => print_history(&ctx.session.snapshot()),

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /attach <path>     Attach a file to the next message");
            eprintln!("  /regen             Regenerate the last response");
            eprintln!("  /reset             Clear the conversation");
            eprintln!("  /index <path>...   Add files or directories to the document store");
            eprintln!("  /history           Show the conversation log");
            eprintln!("  /exit, /quit       Exit the chat");
            eprintln!("  /help              Show this help");
            eprintln!("Press Ctrl+C while a response is streaming to stop it.");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    Ok(false)
}

fn print_history(log: &[RawTurn]) {
    if log.is_empty() {
        eprintln!("(empty)");
        return;
    }
    for (i, turn) in log.iter().enumerate() {
        match (&turn.input, &turn.response) {
            (Some(InputPart::Attachment { path, .. }), _) => {
                eprintln!("[{i}] attached {}", path.display());
            }
            (Some(InputPart::Text(text)), response) => {
                eprintln!("[{i}] you: {text}");
                match response {
                    Some(Response::Text(reply)) => {
                        let marker = match turn.completion {
                            Some(Completion::Stopped) => " (stopped)",
                            Some(Completion::Failed) => " (failed)",
                            _ => "",
                        };
                        eprintln!("    bot{marker}: {}", presentation::present(reply));
                    }
                    _ => eprintln!("    (pending)"),
                }
            }
            (None, _) => {
                if let Some(path) = pl_sessions::session::artifact_path(turn) {
                    eprintln!("[{i}] artifact {}", path.display());
                }
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message sending + streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_message(
    session: &GenerationSession,
    text: &str,
    attachments: &[PathBuf],
) -> anyhow::Result<()> {
    session.submit(text, attachments)?;
    let stream = session.generate().await?;
    relay(session, stream).await;
    Ok(())
}

/// Print a response stream, stopping the generation on Ctrl+C.
async fn relay(session: &GenerationSession, mut stream: BoxStream<'static, PlResult<String>>) {
    let mut printer = StreamPrinter::default();
    let mut latest = String::new();
    let mut interrupted = false;
    let mut stopped = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(display)) => {
                    if let Some(text) = printer.update(&display) {
                        print!("{text}");
                        std::io::stdout().flush().ok();
                    }
                    latest = display;
                }
                Some(Err(e)) => {
                    if let Some(text) = printer.finish(&latest) {
                        print!("{text}");
                    }
                    println!();
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                    return;
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                stopped = session.stop();
            }
        }
    }

    if let Some(text) = printer.finish(&latest) {
        print!("{text}");
    }
    println!();
    if stopped {
        eprintln!("(response stopped)");
    }
    println!();
}
