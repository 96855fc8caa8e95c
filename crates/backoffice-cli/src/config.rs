//! Command-line arguments and the configuration derived from them.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use backoffice_client::config::{API_TIMEOUT_ENV, API_URL_ENV};
use backoffice_client::ClientConfig;

use crate::formatter::OutputFormat;

/// Default log directive when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_DIRECTIVE: &str = "backoffice=warn";

/// Backoffice command-line client
#[derive(Debug, Parser)]
#[command(name = "backoffice")]
#[command(version, about = "Sign in to a Backoffice API and check what the session may do")]
pub struct Args {
    /// Base URL of the API.
    #[arg(long, env = API_URL_ENV)]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, env = API_TIMEOUT_ENV, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Directory holding the session, settings and cookies between runs.
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Log filter, e.g. `debug` or `backoffice_client=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session.
    Logout,
    /// Revalidate the stored session and show the principal.
    Whoami,
    /// Check a permission requirement: `*`, `key`, `a,b` (all) or `a|b` (any).
    Can { required: String },
    /// Decide what visiting a route would do.
    Visit { route: String },
    /// List known routes and the decision for the current session.
    Routes,
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub state_dir: PathBuf,
    pub format: OutputFormat,
}

impl From<&Args> for CliConfig {
    fn from(args: &Args) -> Self {
        let state_dir = args.state_dir.clone().unwrap_or_else(default_state_dir);
        Self {
            base_url: args
                .base_url
                .as_ref()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            timeout: Duration::from_millis(args.timeout_ms),
            state_dir,
            format: args.format,
        }
    }
}

impl CliConfig {
    /// Client configuration for the API.
    ///
    /// The sign-in redirect is published right away: nothing is on screen
    /// long enough to read a notice before it.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let Some(base_url) = &self.base_url else {
            anyhow::bail!("no API URL configured: pass --base-url or set {}", API_URL_ENV);
        };

        let config = ClientConfig::new(base_url.as_str())
            .with_timeout(self.timeout)
            .with_expiry_redirect_delay(Duration::ZERO);
        config.validate()?;
        Ok(config)
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("backoffice")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_config_from_args() {
        let args = parse(&[
            "backoffice",
            "--base-url",
            " http://localhost:3000 ",
            "--timeout-ms",
            "2500",
            "--state-dir",
            "/tmp/bo",
            "whoami",
        ]);
        let config = CliConfig::from(&args);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/bo"));

        let client = config.client_config().unwrap();
        assert_eq!(client.expiry_redirect_delay, Duration::ZERO);
    }

    #[test]
    fn test_missing_base_url_fails() {
        let mut config = CliConfig::from(&parse(&["backoffice", "--state-dir", "/tmp/bo", "routes"]));
        config.base_url = None;
        let err = config.client_config().unwrap_err();
        assert!(err.to_string().contains(API_URL_ENV));
    }

    #[test]
    fn test_parse_commands() {
        let args = parse(&["backoffice", "can", "admin-view|role-view"]);
        assert!(matches!(args.command, Command::Can { ref required } if required == "admin-view|role-view"));

        let args = parse(&["backoffice", "login", "--email", "a@b.c", "--password", "pw"]);
        assert!(matches!(args.command, Command::Login { .. }));
    }
}
