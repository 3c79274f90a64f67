use clap::Parser;
use tracing_subscriber::EnvFilter;

use pl_cli::cli::{Cli, Command, ConfigCommand};
use pl_domain::config::ObservabilityConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to chat when no subcommand is given.
        None => {
            let (config, _) = pl_cli::cli::load_config()?;
            init_tracing(&config.observability);
            pl_cli::cli::chat::chat(config, true).await
        }
        Some(Command::Chat { no_rag }) => {
            let (config, _) = pl_cli::cli::load_config()?;
            init_tracing(&config.observability);
            pl_cli::cli::chat::chat(config, !no_rag).await
        }
        Some(Command::Run {
            message,
            attachments,
            no_rag,
            json,
        }) => {
            let (config, _) = pl_cli::cli::load_config()?;
            init_tracing(&config.observability);
            pl_cli::cli::run::run(config, message, attachments, !no_rag, json).await
        }
        Some(Command::Index { paths, json }) => {
            let (config, _) = pl_cli::cli::load_config()?;
            init_tracing(&config.observability);
            pl_cli::cli::index::index(config, paths, json).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = pl_cli::cli::load_config()?;
            let valid = pl_cli::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = pl_cli::cli::load_config()?;
            pl_cli::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("parley {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize stderr tracing so diagnostics never mix with stdout output.
///
/// `RUST_LOG` wins over `observability.default_filter`. With
/// `observability.json_logs` every line is a JSON object, which carries
/// `pl_event` trace events as-is.
fn init_tracing(obs: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&obs.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if obs.json_logs {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
