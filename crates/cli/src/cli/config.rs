use pl_domain::config::{Config, ConfigSeverity};

use crate::bootstrap;

/// Validate the config (with the prompt template file resolved), printing
/// any issues. Returns `false` when errors are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let mut resolved = config.clone();
    if let Err(e) = bootstrap::resolve_prompt(&mut resolved) {
        println!("[ERROR] prompt.template_path: {e:#}");
        println!("\n1 error(s), 0 warning(s) in {config_path}");
        return false;
    }

    let issues = resolved.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}
