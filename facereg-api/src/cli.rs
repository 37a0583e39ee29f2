//! Command-line arguments for facereg-api
//!
//! Every flag falls back to an environment variable; unset values defer to
//! the TOML file and then to compiled defaults.

use clap::Parser;
use facereg_common::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "facereg-api")]
#[command(about = "Face registration and recognition relay server")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "FACEREG_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "FACEREG_HOST")]
    pub host: Option<String>,

    /// SQLite database file
    #[arg(long, env = "FACEREG_DATABASE")]
    pub database: Option<PathBuf>,

    /// Base URL of the face inference service
    #[arg(long, env = "PYTHON_SERVICE_URL")]
    pub inference_url: Option<String>,

    /// WebSocket URL of the chat service (empty disables chat)
    #[arg(long, env = "CHAT_SERVICE_URL")]
    pub chat_url: Option<String>,

    /// Origin allowed by CORS
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Per-request timeout for collaborator calls, in seconds (0 = none)
    #[arg(long, env = "FACEREG_UPSTREAM_TIMEOUT")]
    pub upstream_timeout_secs: Option<u64>,

    /// TOML config file
    #[arg(short, long, env = "FACEREG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `facereg_api=trace`
    #[arg(long, env = "FACEREG_LOG")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host,
            port: self.port,
            database: self.database,
            inference_url: self.inference_url,
            chat_url: self.chat_url,
            frontend_url: self.frontend_url,
            upstream_timeout_secs: self.upstream_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 4] = [
        "FACEREG_PORT",
        "PYTHON_SERVICE_URL",
        "CHAT_SERVICE_URL",
        "FACEREG_LOG",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_no_flags_leaves_everything_unset() {
        clear_env();
        let args = Args::parse_from(["facereg-api"]);
        assert!(args.port.is_none());
        assert!(args.log_level.is_none());
        assert_eq!(args.into_overrides(), ConfigOverrides::default());
    }

    #[test]
    #[serial]
    fn test_env_fallbacks() {
        clear_env();
        std::env::set_var("FACEREG_PORT", "5100");
        std::env::set_var("PYTHON_SERVICE_URL", "http://inference:5001");

        let args = Args::parse_from(["facereg-api"]);
        assert_eq!(args.port, Some(5100));
        assert_eq!(args.inference_url.as_deref(), Some("http://inference:5001"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_flag_beats_env() {
        clear_env();
        std::env::set_var("FACEREG_PORT", "5100");

        let args = Args::parse_from(["facereg-api", "--port", "6000", "--chat-url", ""]);
        let overrides = args.into_overrides();
        assert_eq!(overrides.port, Some(6000));
        assert_eq!(overrides.chat_url.as_deref(), Some(""));

        clear_env();
    }
}
