//! Configuration for the pool client
//!
//! Values come from the command line, environment variables and an
//! optional YAML or JSON file. Anything given on the command line or in
//! the environment wins over the file.

use crate::claim::RepositoryConfig;
use crate::pow::DatasetLocator;
use crate::retry::RetryPolicy;
use crate::utils::expand_home;
use crate::{Error, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which submitted claim the timer loop audits next
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditPolicy {
    /// The claim submitted right before the current one
    Previous,
    /// The lowest-numbered claim still waiting for verification
    OldestUnverified,
}

impl fmt::Display for AuditPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditPolicy::Previous => write!(f, "previous"),
            AuditPolicy::OldestUnverified => write!(f, "oldest-unverified"),
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
    Pretty,
}

/// Help section for settings only an embedding binary with a chain backend reads
pub const POOL_HEADING: &str = "Pool runtime (read by embedding binaries)";

/// Complete configuration for the pool client
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(
    name = "smartpool-client",
    version = env!("CARGO_PKG_VERSION"),
    about = "SmartPool mining pool client",
    long_about = "Collects miner shares into claims, commits them to the pool contract and proves them on demand",
    after_help = "This binary runs the offline dataset tools. Pool runtime settings are checked here but only take effect in a binary that links node, contract and Ethash backends."
)]
pub struct Config {
    /// Print program info and exit
    #[arg(long)]
    #[serde(default)]
    pub info: bool,

    /// Print the parsed configuration and exit
    #[arg(long)]
    #[serde(default)]
    pub print_config: bool,

    /// Configuration file path (YAML, or JSON with a .json extension)
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Log level
    #[arg(short = 'l', long, env = "SMARTPOOL_LOG_LEVEL", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, default_value = "plain")]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Shares per claim before it is submitted
    #[arg(long, default_value = "13", help_heading = POOL_HEADING)]
    #[serde(default = "default_share_threshold")]
    pub share_threshold: usize,

    /// Difficulty a solution must meet to count as a share
    #[arg(long, default_value = "100000", help_heading = POOL_HEADING)]
    #[serde(default = "default_share_difficulty")]
    pub share_difficulty: u64,

    /// Period of the rotation and verification loop (e.g. "1m", "30s")
    #[arg(long, default_value = "1m", help_heading = POOL_HEADING)]
    #[serde(default = "default_submit_interval")]
    pub submit_interval: String,

    /// Which submitted claim to audit next
    #[arg(long, default_value = "previous", help_heading = POOL_HEADING)]
    #[serde(default = "default_audit_policy")]
    pub audit_policy: AuditPolicy,

    /// Fixed position of the audited share within a claim
    #[arg(long, default_value = "8", help_heading = POOL_HEADING)]
    #[serde(default = "default_audit_index")]
    pub audit_index: Option<usize>,

    /// Take the audited position from the contract's claim seed instead
    #[arg(long, help_heading = POOL_HEADING)]
    #[serde(default)]
    pub audit_from_seed: bool,

    /// Directory holding full dataset files
    #[arg(long, default_value = "~/.ethash", help_heading = POOL_HEADING)]
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: PathBuf,

    /// Revision number in dataset file names
    #[arg(long, default_value = "23", help_heading = POOL_HEADING)]
    #[serde(default = "default_dataset_revision")]
    pub dataset_revision: u32,

    /// Miner RPC interface
    #[arg(long, default_value = "127.0.0.1", help_heading = POOL_HEADING)]
    #[serde(default = "default_rpc_interface")]
    pub rpc_interface: String,

    /// Miner RPC port
    #[arg(long, default_value = "1633", help_heading = POOL_HEADING)]
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Transaction confirmation poll interval in milliseconds
    #[arg(long, default_value = "1000", help_heading = POOL_HEADING)]
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,

    /// Give up waiting for a transaction after this many seconds, 0 waits forever
    #[arg(long, default_value = "0", help_heading = POOL_HEADING)]
    #[serde(default)]
    pub confirmation_timeout_secs: u64,

    /// Maximum attempts for contract and node calls
    #[arg(long, default_value = "10", help_heading = POOL_HEADING)]
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base retry delay in milliseconds
    #[arg(long, default_value = "100", help_heading = POOL_HEADING)]
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Maximum retry delay in milliseconds
    #[arg(long, default_value = "5000", help_heading = POOL_HEADING)]
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay: u64,

    /// Print the tree root and epoch data of a dataset file and exit
    #[arg(long, value_name = "FILE")]
    pub dataset_root: Option<PathBuf>,

    /// Print dataset elements and branches for --index values and exit
    #[arg(long, value_name = "FILE", requires = "index")]
    pub dataset_proof: Option<PathBuf>,

    /// Dataset word indices for --dataset-proof
    #[arg(long, num_args = 1..)]
    #[serde(default)]
    pub index: Vec<u32>,
}

impl Config {
    /// Parse the command line, merge the config file if one is given, and
    /// validate
    pub async fn load() -> Result<Self> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches).await
    }

    async fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config =
            Self::from_arg_matches(matches).map_err(|e| Error::config(e.to_string()))?;

        if let Some(path) = config.config_file.clone() {
            let file_config = Self::load_from_file(&path).await?;
            config = config.merge_with_file(file_config, |id| explicitly_set(matches, id));
        }

        config.validate()?;
        Ok(config)
    }

    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Take file values for every setting the user did not pass explicitly
    fn merge_with_file(self, file: Self, explicit: impl Fn(&str) -> bool) -> Self {
        let mut merged = self;
        macro_rules! from_file {
            ($($field:ident),* $(,)?) => {
                $(
                    if !explicit(stringify!($field)) {
                        merged.$field = file.$field;
                    }
                )*
            };
        }
        from_file!(
            log_level,
            log_format,
            share_threshold,
            share_difficulty,
            submit_interval,
            audit_policy,
            audit_index,
            audit_from_seed,
            dataset_dir,
            dataset_revision,
            rpc_interface,
            rpc_port,
            confirmation_poll_ms,
            confirmation_timeout_secs,
            max_retries,
            retry_delay,
            max_retry_delay,
        );
        merged
    }

    pub fn validate(&self) -> Result<()> {
        if self.share_threshold == 0 {
            return Err(Error::config("Share threshold must be at least 1"));
        }

        if self.share_difficulty == 0 {
            return Err(Error::config("Share difficulty must be positive"));
        }

        if let Some(index) = self.effective_audit_index() {
            if index >= self.share_threshold {
                return Err(Error::config(format!(
                    "Audit index {} must be below the share threshold {}",
                    index, self.share_threshold
                )));
            }
        }

        if self.submit_interval()?.is_zero() {
            return Err(Error::config("Submit interval must be positive"));
        }

        if self.rpc_interface.parse::<IpAddr>().is_err() {
            return Err(Error::config("Invalid RPC interface address"));
        }

        if self.confirmation_poll_ms == 0 {
            return Err(Error::config("Confirmation poll interval must be positive"));
        }

        Ok(())
    }

    pub fn submit_interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.submit_interval).map_err(|e| {
            Error::config(format!(
                "Invalid submit interval {:?}: {}",
                self.submit_interval, e
            ))
        })
    }

    /// Audit position, `None` when it comes from the claim seed
    pub fn effective_audit_index(&self) -> Option<usize> {
        if self.audit_from_seed {
            None
        } else {
            self.audit_index
        }
    }

    pub fn share_difficulty(&self) -> BigUint {
        BigUint::from(self.share_difficulty)
    }

    pub fn rpc_socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .rpc_interface
            .parse()
            .map_err(|e| Error::config(format!("Invalid RPC interface: {}", e)))?;
        Ok(SocketAddr::new(ip, self.rpc_port))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_delay),
            Duration::from_millis(self.max_retry_delay),
        )
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        (self.confirmation_timeout_secs > 0)
            .then(|| Duration::from_secs(self.confirmation_timeout_secs))
    }

    pub fn dataset_locator(&self) -> DatasetLocator {
        DatasetLocator::new(expand_home(&self.dataset_dir), self.dataset_revision)
    }

    pub fn repository_config(&self) -> Result<RepositoryConfig> {
        Ok(RepositoryConfig {
            share_threshold: self.share_threshold,
            audit_policy: self.audit_policy,
            audit_index: self.effective_audit_index(),
            datasets: self.dataset_locator(),
            submit_interval: self.submit_interval()?,
            confirmation_poll: Duration::from_millis(self.confirmation_poll_ms),
            confirmation_timeout: self.confirmation_timeout(),
            retry: self.retry_policy(),
        })
    }
}

fn explicitly_set(matches: &ArgMatches, id: &str) -> bool {
    matches!(
        matches.value_source(id),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_log_format() -> LogFormat { LogFormat::Plain }
fn default_share_threshold() -> usize { 13 }
fn default_share_difficulty() -> u64 { 100_000 }
fn default_submit_interval() -> String { "1m".to_string() }
fn default_audit_policy() -> AuditPolicy { AuditPolicy::Previous }
fn default_audit_index() -> Option<usize> { Some(8) }
fn default_dataset_dir() -> PathBuf { PathBuf::from("~/.ethash") }
fn default_dataset_revision() -> u32 { crate::pow::DEFAULT_DATASET_REVISION }
fn default_rpc_interface() -> String { "127.0.0.1".to_string() }
fn default_rpc_port() -> u16 { 1633 }
fn default_confirmation_poll_ms() -> u64 { 1000 }
fn default_max_retries() -> usize { 10 }
fn default_retry_delay() -> u64 { 100 }
fn default_max_retry_delay() -> u64 { 5000 }

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["smartpool-client"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = parse(&[]);
        assert_eq!(config.share_threshold, 13);
        assert_eq!(config.share_difficulty, 100_000);
        assert_eq!(config.audit_policy, AuditPolicy::Previous);
        assert_eq!(config.effective_audit_index(), Some(8));
        assert_eq!(config.submit_interval().unwrap(), Duration::from_secs(60));
        assert_eq!(config.rpc_socket_addr().unwrap().port(), 1633);
        assert_eq!(config.confirmation_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_repository_config() {
        let config = parse(&[
            "--share-threshold",
            "4",
            "--audit-from-seed",
            "--audit-policy",
            "oldest-unverified",
            "--dataset-dir",
            "/data/ethash",
            "--confirmation-timeout-secs",
            "30",
        ]);
        let repo = config.repository_config().unwrap();
        assert_eq!(repo.share_threshold, 4);
        assert_eq!(repo.audit_index, None);
        assert_eq!(repo.audit_policy, AuditPolicy::OldestUnverified);
        assert_eq!(repo.datasets.dir(), Path::new("/data/ethash"));
        assert_eq!(repo.confirmation_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_validation_rules() {
        assert_matches!(parse(&["--share-threshold", "0"]).validate(), Err(Error::Config { .. }));
        assert_matches!(parse(&["--share-threshold", "8"]).validate(), Err(Error::Config { .. }));
        assert!(parse(&["--share-threshold", "8", "--audit-from-seed"]).validate().is_ok());
        assert_matches!(parse(&["--share-difficulty", "0"]).validate(), Err(Error::Config { .. }));
        assert_matches!(parse(&["--submit-interval", "soon"]).validate(), Err(Error::Config { .. }));
        assert_matches!(parse(&["--submit-interval", "0s"]).validate(), Err(Error::Config { .. }));
        assert_matches!(parse(&["--rpc-interface", "localhost"]).validate(), Err(Error::Config { .. }));
    }

    #[test]
    fn test_dataset_proof_requires_index() {
        let result = Config::try_parse_from(["smartpool-client", "--dataset-proof", "/tmp/full"]);
        assert!(result.is_err());
        let config = parse(&["--dataset-proof", "/tmp/full", "--index", "3", "17"]);
        assert_eq!(config.index, vec![3, 17]);
    }

    #[tokio::test]
    async fn test_config_from_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "share_threshold: 20\nsubmit_interval: 90s\naudit_index: ~\nrpc_port: 9000\n"
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.share_threshold, 20);
        assert_eq!(config.submit_interval().unwrap(), Duration::from_secs(90));
        assert_eq!(config.audit_index, None);
        assert_eq!(config.rpc_port, 9000);
        assert_eq!(config.share_difficulty, 100_000);
    }

    #[tokio::test]
    async fn test_command_line_wins_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "share_threshold: 20\nrpc_port: 9000\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let matches = Config::command()
            .try_get_matches_from([
                "smartpool-client",
                "--config-file",
                path.as_str(),
                "--rpc-port",
                "7000",
            ])
            .unwrap();
        let config = Config::from_matches(&matches).await.unwrap();
        assert_eq!(config.share_threshold, 20);
        assert_eq!(config.rpc_port, 7000);
    }

    #[test]
    fn test_display_and_yaml_round_trip() {
        assert_eq!(AuditPolicy::OldestUnverified.to_string(), "oldest-unverified");
        let yaml = serde_yaml::to_string(&parse(&[])).unwrap();
        assert!(yaml.contains("audit_policy: previous"));
    }

    #[test]
    fn test_runtime_flags_are_grouped_in_help() {
        let command = Config::command();
        let heading = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_help_heading())
        };
        for id in ["rpc_port", "submit_interval", "audit_index", "max_retries"] {
            assert_eq!(heading(id), Some(POOL_HEADING), "{}", id);
        }
        assert_eq!(heading("dataset_root"), None);
        assert_eq!(heading("log_level"), None);
    }
}
