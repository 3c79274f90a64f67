pub mod chat;
pub mod config;
pub mod index;
pub mod printer;
pub mod run;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Parley: streaming chat with retrieval-augmented prompts.
#[derive(Debug, Parser)]
#[command(name = "parley", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat {
        /// Do not augment prompts with retrieved documents.
        #[arg(long)]
        no_rag: bool,
    },
    /// Send a single message and print the response.
    Run {
        /// The message to send.
        message: String,
        /// Attach a file (image or document). Repeatable.
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,
        /// Do not augment the prompt with retrieved documents.
        #[arg(long)]
        no_rag: bool,
        /// Output the response and log as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Chunk and embed documents into an in-memory store and report the result.
    Index {
        /// Files or directories to index.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Output the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `PARLEY_CONFIG` (or
/// `parley.toml` by default). Returns the parsed config and the path used.
pub fn load_config() -> anyhow::Result<(pl_domain::config::Config, String)> {
    let config_path = std::env::var("PARLEY_CONFIG").unwrap_or_else(|_| "parley.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Parse `path`, or return defaults when it does not exist.
pub fn load_config_from(path: &Path) -> anyhow::Result<pl_domain::config::Config> {
    if !path.exists() {
        return Ok(pl_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))
}
