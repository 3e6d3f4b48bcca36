//! Command line of the contract runner binary

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{RunnerConfig, TrackerConfig};
use crate::error::E2eResult;

/// Flags `cargo test` hands to every test binary
const HARNESS_FLAGS: &[&str] = &[
    "--nocapture",
    "--quiet",
    "-q",
    "--ignored",
    "--include-ignored",
    "--show-output",
    "--exact",
];

/// Harness flags followed by a value, either `--flag value` or `--flag=value`
const HARNESS_VALUE_FLAGS: &[&str] = &["--test-threads", "--color", "--format", "--skip"];

#[derive(Parser, Debug)]
#[command(name = "routewatch")]
#[command(about = "Endpoint contract runner")]
pub struct Args {
    /// Path to the runner configuration file
    #[arg(short, long, env = "ROUTEWATCH_CONFIG", default_value = "routewatch.toml")]
    pub config: PathBuf,

    /// Base URL of the server under test
    #[arg(long, env = "ROUTEWATCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Basic auth user
    #[arg(long, env = "ROUTEWATCH_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "ROUTEWATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Reject invalid TLS certificates
    #[arg(long)]
    pub verify_tls: bool,

    /// Reference catalog file or directory
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Deviation table
    #[arg(long)]
    pub deviations: Option<PathBuf>,

    /// Treat this defect as open (repeatable); replaces the configured tracker
    #[arg(long = "open-defect")]
    pub open_defects: Vec<String>,

    /// Bugzilla base URL; replaces the configured tracker
    #[arg(long, env = "ROUTEWATCH_BUGZILLA_URL", conflicts_with = "open_defects")]
    pub bugzilla_url: Option<String>,

    /// Also check the ping endpoint
    #[arg(long)]
    pub check_services: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Drop the test harness arguments `cargo test` forwards, keeping the program
/// name and everything else untouched so unknown flags still fail to parse.
///
/// Bare words are test-name filters and are dropped as well.
pub fn strip_harness_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut kept: Vec<OsString> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let Some(text) = arg.to_str() else {
            kept.push(arg);
            continue;
        };
        if HARNESS_FLAGS.contains(&text) {
            continue;
        }
        if HARNESS_VALUE_FLAGS.contains(&text) {
            args.next();
            continue;
        }
        if HARNESS_VALUE_FLAGS
            .iter()
            .any(|flag| text.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
        {
            continue;
        }
        if !text.starts_with('-') && !follows_value_flag(&kept) {
            continue;
        }
        kept.push(arg);
    }

    kept
}

/// Whether the last kept argument is a runner flag still waiting for its value
fn follows_value_flag(kept: &[OsString]) -> bool {
    kept.last()
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| {
            matches!(
                arg,
                "-c" | "--config"
                    | "--base-url"
                    | "--username"
                    | "--password"
                    | "--reference"
                    | "--deviations"
                    | "--open-defect"
                    | "--bugzilla-url"
                    | "-o"
                    | "--output"
            )
        })
}

impl Args {
    /// Whether a server to check was named, on the command line, in the
    /// environment, or through an existing config file
    pub fn has_server(&self) -> bool {
        self.base_url.is_some() || self.config.exists()
    }

    /// Load the config file and lay the command line over it
    pub fn into_config(self) -> E2eResult<RunnerConfig> {
        let mut config = RunnerConfig::load(&self.config)?;

        if let Some(base_url) = self.base_url {
            config.server.base_url = base_url;
        }
        if self.username.is_some() {
            config.server.username = self.username;
        }
        if self.password.is_some() {
            config.server.password = self.password;
        }
        if self.verify_tls {
            config.server.accept_invalid_certs = false;
        }
        if let Some(reference) = self.reference {
            config.contract.reference = reference;
        }
        if self.deviations.is_some() {
            config.contract.deviations = self.deviations;
        }
        if self.check_services {
            config.contract.check_services = true;
        }
        if !self.open_defects.is_empty() {
            config.tracker = TrackerConfig::Static {
                open: self.open_defects.into_iter().collect(),
            };
        } else if let Some(url) = self.bugzilla_url {
            config.tracker = TrackerConfig::Bugzilla { url };
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_harness_flags_are_dropped() {
        let args = strip_harness_args([
            "contract",
            "--nocapture",
            "--test-threads",
            "1",
            "--color=never",
            "-q",
            "matching_server",
        ]);
        assert_eq!(strings(args), vec!["contract"]);
    }

    #[test]
    fn test_runner_flags_survive_stripping() {
        let args = strip_harness_args([
            "contract",
            "--nocapture",
            "--base-url",
            "https://satellite",
            "--open-defect",
            "1166875",
        ]);
        assert_eq!(
            strings(args),
            vec!["contract", "--base-url", "https://satellite", "--open-defect", "1166875"]
        );
    }

    #[test]
    fn test_mistyped_flag_is_rejected() {
        let args = strip_harness_args(["contract", "--verfy-tls"]);
        assert_eq!(strings(args.clone()), vec!["contract", "--verfy-tls"]);

        let err = Args::try_parse_from(args).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_overrides_reach_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "contract",
            "--config",
            dir.path().join("absent.toml").to_str().unwrap(),
            "--base-url",
            "http://127.0.0.1:3000",
            "--verify-tls",
            "--open-defect",
            "1325995",
            "--check-services",
        ])
        .unwrap();
        assert!(args.has_server());

        let config = args.into_config().unwrap();

        assert_eq!(config.server.base_url, "http://127.0.0.1:3000");
        assert!(!config.server.accept_invalid_certs);
        assert!(config.contract.check_services);
        assert_eq!(
            config.tracker,
            TrackerConfig::Static {
                open: ["1325995".to_string()].into_iter().collect()
            }
        );
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "contract",
            "--config",
            dir.path().join("absent.toml").to_str().unwrap(),
            "--base-url",
            "satellite",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}
