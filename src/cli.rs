//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

/// Authentication gate for the web console backend
#[derive(Parser, Debug)]
#[command(name = "console-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CONSOLE_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host to bind to (overrides config)
    #[arg(long, env = "CONSOLE_GATE_HOST")]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "CONSOLE_GATE_PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CONSOLE_GATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CONSOLE_GATE_LOG_FORMAT")]
    pub log_format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["console-gate"]);
        assert!(cli.config.is_none());
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(cli.log_format.is_none());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "console-gate",
            "--config",
            "/etc/console-gate.yaml",
            "--host",
            "0.0.0.0",
            "--port",
            "8443",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.config.unwrap(), PathBuf::from("/etc/console-gate.yaml"));
        assert_eq!(cli.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(cli.port, Some(8443));
        assert_eq!(cli.log_format.as_deref(), Some("json"));
    }
}
