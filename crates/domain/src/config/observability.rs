use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Observability (log output) configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how the CLI installs its `tracing` subscriber.
///
/// `RUST_LOG` always wins over `default_filter` when it is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Emit one JSON object per line instead of compact text.
    #[serde(default)]
    pub json_logs: bool,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "d_default_filter")]
    pub default_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            default_filter: d_default_filter(),
        }
    }
}

fn d_default_filter() -> String {
    "warn".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_compact_warn() {
        let cfg = ObservabilityConfig::default();
        assert!(!cfg.json_logs);
        assert_eq!(cfg.default_filter, "warn");
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: ObservabilityConfig = toml::from_str("").unwrap();
        assert!(!cfg.json_logs);
        assert_eq!(cfg.default_filter, "warn");
    }

    #[test]
    fn deserialize_overrides() {
        let toml_str = r#"
            json_logs = true
            default_filter = "pl_sessions=debug,info"
        "#;
        let cfg: ObservabilityConfig = toml::from_str(toml_str).unwrap();
        assert!(cfg.json_logs);
        assert_eq!(cfg.default_filter, "pl_sessions=debug,info");
    }
}
